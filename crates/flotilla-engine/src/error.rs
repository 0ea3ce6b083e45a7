use thiserror::Error;

use flotilla_storage::StorageError;

/// Errors that can occur within the scheduling engine.
///
/// Benign mid-tick races (a job or node vanishing between snapshot and use)
/// are skipped, not raised; only the storage backend can fail an operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
