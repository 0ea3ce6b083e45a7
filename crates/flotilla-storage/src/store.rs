use std::sync::Arc;

use async_trait::async_trait;

use flotilla_core::types::{ActionStatus, Job, Node};

use crate::error::{Result, StorageError};
use crate::memory::MemoryStore;

/// Storage backend selector. Matches the `--storage` CLI flag and the
/// `storage.kind` config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgresql,
    Redis,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StorageKind::Memory => "memory",
            StorageKind::Postgresql => "postgresql",
            StorageKind::Redis => "redis",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StorageKind::Memory),
            "postgresql" => Ok(StorageKind::Postgresql),
            "redis" => Ok(StorageKind::Redis),
            other => Err(format!("unexpected storage kind: {other}")),
        }
    }
}

/// Uniform entity store contract.
///
/// List operations return records in insertion order; the engine's
/// first-fit placement depends on that. Updates replace the full record.
/// `add_*` has no defined behavior on a duplicate id — the engine's
/// monotonic counters never produce one.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Release backend resources. Called once on shutdown.
    fn close(&self);

    async fn add_node(&self, node: Node) -> Result<()>;
    async fn get_node(&self, node_id: &str) -> Result<Option<Node>>;
    async fn update_node(&self, node: Node) -> Result<ActionStatus>;
    async fn delete_node(&self, node_id: &str) -> Result<ActionStatus>;
    async fn get_nodes(&self) -> Result<Vec<Node>>;

    async fn add_job(&self, job: Job) -> Result<()>;
    async fn get_job(&self, job_id: &str) -> Result<Option<Job>>;
    async fn update_job(&self, job: Job) -> Result<ActionStatus>;
    async fn delete_job(&self, job_id: &str) -> Result<ActionStatus>;
    async fn get_jobs(&self) -> Result<Vec<Job>>;
}

/// Open the backend for `kind`. Unimplemented kinds fail here, at startup,
/// rather than surfacing mid-operation.
pub fn open(kind: StorageKind) -> Result<Arc<dyn Storage>> {
    match kind {
        StorageKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageKind::Postgresql | StorageKind::Redis => Err(StorageError::NotImplemented {
            kind: kind.to_string(),
        }),
    }
}
