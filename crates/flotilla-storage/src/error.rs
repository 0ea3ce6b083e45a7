use thiserror::Error;

/// Errors surfaced by the storage layer. The in-memory backend never fails
/// once open; only backend selection can.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend '{kind}' is not implemented")]
    NotImplemented { kind: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;
