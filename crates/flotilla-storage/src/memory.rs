use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use flotilla_core::types::{ActionStatus, Id, Job, Node};

use crate::error::Result;
use crate::store::Storage;

/// Id-keyed records plus their insertion order; `list` must return records
/// in the order they were added.
struct Table<T> {
    records: HashMap<Id, T>,
    order: Vec<Id>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, id: Id, record: T) {
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }

    fn get(&self, id: &str) -> Option<T> {
        self.records.get(id).cloned()
    }

    fn update(&mut self, id: &str, record: T) -> ActionStatus {
        match self.records.get_mut(id) {
            Some(slot) => {
                *slot = record;
                ActionStatus::Ok
            }
            None => ActionStatus::NotFound,
        }
    }

    fn remove(&mut self, id: &str) -> ActionStatus {
        if self.records.remove(id).is_some() {
            self.order.retain(|known| known != id);
            ActionStatus::Ok
        } else {
            ActionStatus::NotFound
        }
    }

    fn list(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }
}

struct Inner {
    jobs: Table<Job>,
    nodes: Table<Node>,
}

/// In-memory storage backend. The lock is a plain `std` mutex; no await
/// point ever sits inside a critical section here.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                jobs: Table::new(),
                nodes: Table::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.jobs.clear();
        inner.nodes.clear();
        debug!("memory store closed");
    }

    async fn add_node(&self, node: Node) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    async fn get_node(&self, node_id: &str) -> Result<Option<Node>> {
        Ok(self.inner.lock().unwrap().nodes.get(node_id))
    }

    async fn update_node(&self, node: Node) -> Result<ActionStatus> {
        let id = node.id.clone();
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.nodes.update(&id, node))
    }

    async fn delete_node(&self, node_id: &str) -> Result<ActionStatus> {
        Ok(self.inner.lock().unwrap().nodes.remove(node_id))
    }

    async fn get_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.inner.lock().unwrap().nodes.list())
    }

    async fn add_job(&self, job: Job) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(self.inner.lock().unwrap().jobs.get(job_id))
    }

    async fn update_job(&self, job: Job) -> Result<ActionStatus> {
        let id = job.id.clone();
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.jobs.update(&id, job))
    }

    async fn delete_job(&self, job_id: &str) -> Result<ActionStatus> {
        Ok(self.inner.lock().unwrap().jobs.remove(job_id))
    }

    async fn get_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.inner.lock().unwrap().jobs.list())
    }
}
