use serde::{Deserialize, Serialize};

/// Storage-layer options for the catalog coordinator.
///
/// The directory flags only shape how backend idents are named; they change
/// nothing about the semantics exposed above this layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Namespace collection idents by database name (`<db>/collection-N`).
    /// Requires engine support.
    #[serde(default)]
    pub directory_per_db: bool,
    /// Place index idents under a separate `index/` segment.
    #[serde(default)]
    pub directory_for_indexes: bool,
    /// Run engine repair on the reserved catalog ident before opening it.
    #[serde(default)]
    pub for_repair: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_off() {
        let config = StorageConfig::default();
        assert!(!config.directory_per_db);
        assert!(!config.directory_for_indexes);
        assert!(!config.for_repair);
    }

    #[test]
    fn test_partial_toml_style_json() {
        let config: StorageConfig = serde_json::from_str(r#"{"directory_per_db":true}"#).unwrap();
        assert!(config.directory_per_db);
        assert!(!config.for_repair);
    }
}
