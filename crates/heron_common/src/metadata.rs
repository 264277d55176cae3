//! Catalog metadata records: what the durable catalog stores per collection.

use serde::{Deserialize, Serialize};

use crate::namespace::Namespace;
use crate::types::KvPrefix;

/// Options recorded for a collection at creation time. Only the fields this
/// layer persists and round-trips; interpretation belongs to higher layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// Collection UUID assigned by the higher-level catalog, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub capped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capped_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capped_max_docs: Option<u64>,
}

/// Per-index record inside a collection's catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    /// Backend ident of the index table.
    pub ident: String,
    /// False while an index build is still in progress.
    #[serde(default = "default_ready")]
    pub ready: bool,
}

fn default_ready() -> bool {
    true
}

/// The durable catalog record for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub ns: Namespace,
    /// Backend ident of the collection table.
    pub ident: String,
    #[serde(default)]
    pub indexes: Vec<IndexMetadata>,
    #[serde(default)]
    pub options: CollectionOptions,
    /// Largest key-space prefix handed to this collection or its indexes.
    #[serde(default)]
    pub max_prefix: KvPrefix,
}

impl CollectionMetadata {
    pub fn new(ns: Namespace, ident: String, options: CollectionOptions, prefix: KvPrefix) -> Self {
        CollectionMetadata {
            ns,
            ident,
            indexes: Vec::new(),
            options,
            max_prefix: prefix,
        }
    }

    /// Find an index record by name.
    pub fn index(&self, name: &str) -> Option<&IndexMetadata> {
        self.indexes.iter().find(|idx| idx.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_json_round_trip() {
        let mut metadata = CollectionMetadata::new(
            Namespace::new("db.c"),
            "collection-4".into(),
            CollectionOptions {
                uuid: Some("e1b2".into()),
                capped: true,
                capped_size_bytes: Some(1 << 20),
                capped_max_docs: None,
            },
            KvPrefix(7),
        );
        metadata.indexes.push(IndexMetadata {
            name: "_id_".into(),
            ident: "index-5".into(),
            ready: true,
        });

        let bytes = serde_json::to_vec(&metadata).unwrap();
        let decoded: CollectionMetadata = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_missing_fields_default() {
        // Records written before an index existed decode with empty indexes.
        let decoded: CollectionMetadata =
            serde_json::from_str(r#"{"ns":"db.c","ident":"collection-1"}"#).unwrap();
        assert!(decoded.indexes.is_empty());
        assert_eq!(decoded.max_prefix, KvPrefix::NOT_PREFIXED);
        assert!(!decoded.options.capped);
    }
}
