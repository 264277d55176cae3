use thiserror::Error;

/// Convenience alias for `Result<T, StorageError>`.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error classification for retry/escalation decisions.
///
/// - `UserError`   — bad input or illegal state transition (4xx equivalent)
/// - `Retryable`   — transient conflict; client SHOULD retry
/// - `Transient`   — timeout, resource exhaustion; client MAY retry after back-off
/// - `InternalBug` — should never happen; triggers alert + diagnostic dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserError,
    Retryable,
    Transient,
    InternalBug,
}

/// Errors surfaced by the catalog-coordination layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Invalid configuration or an illegal state transition.
    #[error("Bad value: {0}")]
    BadValue(String),

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    /// The durable catalog lists a collection whose backing table is gone.
    /// No safe recovery exists for this state.
    #[error("Expected collection does not exist. NS: {ns} Ident: {ident}")]
    UnrecoverableRollback { ns: String, ident: String },

    /// The reserved catalog ident holds records that cannot be decoded.
    #[error("Catalog corruption: {0}")]
    Corruption(String),

    /// Error reported by the key/value backend.
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Classify for retry/escalation decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::BadValue(_) | StorageError::NamespaceNotFound(_) => ErrorKind::UserError,
            StorageError::Engine(_) | StorageError::Io(_) => ErrorKind::Transient,
            StorageError::UnrecoverableRollback { .. }
            | StorageError::Corruption(_)
            | StorageError::Serialization(_) => ErrorKind::InternalBug,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
