use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{error, info};

use flotilla_core::types::{ActionStatus, Id, Job, JobStatus, NewJob, NewNode, Node};
use flotilla_storage::Storage;

use crate::clock::Clock;
use crate::error::Result;
use crate::placement::{fit_available, recalc_allocated_resources};

/// Maximum idle time between scheduling passes when nothing is due, in
/// seconds. Upcoming job completions and state-changing API calls both pull
/// the next pass closer.
pub const SCHEDULING_INTERVAL: u64 = 60;

/// The placement indexes — the source of truth for the running-set
/// topology. Kept behind their own non-async lock so query paths read them
/// without waiting on the engine's write-serialization lock; writers take
/// the guard only for the index mutation itself, never across a storage
/// call, so queries may observe the intermediate states of a multi-step
/// write.
#[derive(Default)]
struct PlacementIndex {
    /// node-id -> job-ids placed on that node, in placement order.
    node_jobs: HashMap<Id, Vec<Id>>,
    /// job-id -> node-id, for every running job.
    jobs_nodes: HashMap<Id, Id>,
}

/// Mutable engine state guarded by the write-serialization lock.
struct EngineState {
    /// Job-ids awaiting placement, in submission order.
    pending_jobs: Vec<Id>,
    next_job_id: u64,
    next_node_id: u64,
    /// Wall-clock seconds of the earliest moment the next tick should run.
    next_schedule_time: f64,
}

/// The scheduling core. Shared between the HTTP control-plane and the
/// background loop as `Arc<Scheduler>`; one async lock serializes every
/// mutating path and is held across the storage calls of each operation,
/// so concurrent writers observe the combined index+record change
/// atomically.
pub struct Scheduler {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
    index: RwLock<PlacementIndex>,
}

impl Scheduler {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            storage,
            clock,
            state: Mutex::new(EngineState {
                pending_jobs: Vec::new(),
                next_job_id: 1,
                next_node_id: 1,
                next_schedule_time: now,
            }),
            index: RwLock::new(PlacementIndex::default()),
        }
    }

    /// Submit a job. It enters the pending queue with status `new` and is
    /// considered on the next tick, which this call forces immediately.
    pub async fn submit_job(&self, new_job: NewJob) -> Result<Id> {
        let mut state = self.state.lock().await;
        let job_id = state.next_job_id.to_string();
        state.next_job_id += 1;

        let job = Job {
            id: job_id.clone(),
            status: JobStatus::New,
            expected_run_time: new_job.expected_run_time,
            requests_cpu: new_job.requests_cpu,
            requests_memory: new_job.requests_memory,
            created_at: self.clock.now(),
            started_at: None,
        };
        state.pending_jobs.push(job_id.clone());
        self.storage.add_job(job).await?;
        state.next_schedule_time = self.clock.now();

        info!(job_id = %job_id, "job submitted");
        Ok(job_id)
    }

    /// Delete a job in any state. Placement membership is removed here; the
    /// host node's persisted allocation counters stay stale until the next
    /// tick's recount. In that window placement sees over-counted
    /// allocations on the node, so it may under-utilize but cannot
    /// over-commit.
    pub async fn delete_job(&self, job_id: &str) -> Result<ActionStatus> {
        let mut state = self.state.lock().await;
        if let Some(pos) = state.pending_jobs.iter().position(|id| id == job_id) {
            state.pending_jobs.remove(pos);
            state.next_schedule_time = self.clock.now();
        }
        let was_placed = {
            let mut index = self.index.write().unwrap();
            match index.jobs_nodes.remove(job_id) {
                Some(node_id) => {
                    if let Some(placed) = index.node_jobs.get_mut(&node_id) {
                        placed.retain(|id| id != job_id);
                    }
                    true
                }
                None => false,
            }
        };
        if was_placed {
            state.next_schedule_time = self.clock.now();
        }
        let status = self.storage.delete_job(job_id).await?;
        if status == ActionStatus::Ok {
            info!(job_id = %job_id, "job deleted");
        }
        Ok(status)
    }

    /// Terminate a running job. Pending, completed and unknown jobs are all
    /// `NotFound` — only membership in the running set qualifies.
    pub async fn terminate_job(&self, job_id: &str) -> Result<ActionStatus> {
        let mut state = self.state.lock().await;
        let host = {
            let mut index = self.index.write().unwrap();
            let host = index.jobs_nodes.remove(job_id);
            if let Some(node_id) = &host {
                if let Some(placed) = index.node_jobs.get_mut(node_id) {
                    placed.retain(|id| id != job_id);
                }
            }
            host
        };
        let Some(node_id) = host else {
            return Ok(ActionStatus::NotFound);
        };
        state.next_schedule_time = self.clock.now();

        if let Some(mut job) = self.storage.get_job(job_id).await? {
            job.status = JobStatus::Terminated;
            self.storage.update_job(job).await?;
        }
        info!(job_id = %job_id, node_id = %node_id, "job terminated");
        Ok(ActionStatus::Ok)
    }

    /// Register a node with all allocation counters at zero and make it
    /// visible to placement on the next (immediately forced) tick.
    pub async fn add_node(&self, new_node: NewNode) -> Result<Id> {
        let mut state = self.state.lock().await;
        let node_id = state.next_node_id.to_string();
        state.next_node_id += 1;

        let node = Node {
            id: node_id.clone(),
            jobs_capacity: new_node.jobs_capacity,
            jobs_allocated: 0,
            cpu_capacity: new_node.cpu_capacity,
            cpu_allocated: 0.0,
            memory_capacity: new_node.memory_capacity,
            memory_allocated: 0,
        };
        self.storage.add_node(node).await?;
        self.index
            .write()
            .unwrap()
            .node_jobs
            .insert(node_id.clone(), Vec::new());
        state.next_schedule_time = self.clock.now();

        info!(node_id = %node_id, "node added");
        Ok(node_id)
    }

    /// Delete a node. Jobs running on it go back to `new` with `started_at`
    /// cleared and are requeued ahead of already-pending submissions, in
    /// their placement order. Unknown ids fall through to storage for the
    /// `NotFound` verdict.
    pub async fn delete_node(&self, node_id: &str) -> Result<ActionStatus> {
        let mut state = self.state.lock().await;
        let interrupted = {
            let index = self.index.read().unwrap();
            index.node_jobs.get(node_id).cloned().unwrap_or_default()
        };
        if !interrupted.is_empty() {
            for job_id in &interrupted {
                if let Some(mut job) = self.storage.get_job(job_id).await? {
                    job.status = JobStatus::New;
                    job.started_at = None;
                    self.storage.update_job(job).await?;
                }
            }
            {
                let mut index = self.index.write().unwrap();
                for job_id in &interrupted {
                    index.jobs_nodes.remove(job_id);
                }
                index.node_jobs.remove(node_id);
            }
            info!(
                node_id = %node_id,
                interrupted = interrupted.len(),
                "node deleted, running jobs requeued"
            );
            let mut requeued = interrupted;
            requeued.extend(state.pending_jobs.drain(..));
            state.pending_jobs = requeued;
            state.next_schedule_time = self.clock.now();
        }
        Ok(self.storage.delete_node(node_id).await?)
    }

    /// All job records, in storage order.
    pub async fn get_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.storage.get_jobs().await?)
    }

    /// All node records, in storage order.
    pub async fn get_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.storage.get_nodes().await?)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(self.storage.get_job(job_id).await?)
    }

    pub async fn get_node(&self, node_id: &str) -> Result<Option<Node>> {
        Ok(self.storage.get_node(node_id).await?)
    }

    /// Job records currently placed on `node_id`, or `None` for a node the
    /// engine does not know. The distinction comes from the index: a known
    /// node with nothing placed returns an empty list. The engine's
    /// write-serialization lock is never taken here — only the index's own
    /// read guard — so a concurrently removed job may make the result
    /// shorter than the index suggested.
    pub async fn get_node_jobs(&self, node_id: &str) -> Result<Option<Vec<Job>>> {
        let placed = {
            let index = self.index.read().unwrap();
            match index.node_jobs.get(node_id) {
                Some(ids) => ids.clone(),
                None => return Ok(None),
            }
        };
        let mut jobs = Vec::with_capacity(placed.len());
        for job_id in &placed {
            if let Some(job) = self.storage.get_job(job_id).await? {
                jobs.push(job);
            }
        }
        Ok(Some(jobs))
    }

    /// One pass of the scheduling loop. A no-op until `next_schedule_time`
    /// arrives; otherwise completion strictly precedes placement, so
    /// resources freed in this pass are offered to pending jobs in the
    /// same pass.
    pub async fn tick(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if self.clock.now() < state.next_schedule_time {
            return Ok(());
        }
        self.complete_running_jobs(&mut state).await?;
        self.schedule_jobs(&mut state).await?;
        Ok(())
    }

    /// Background driver. Calls [`Scheduler::tick`] once per second until
    /// `shutdown` broadcasts `true`. Tick failures are logged and the loop
    /// keeps going; the design assumes storage is reliable.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("scheduling loop started");
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("scheduling tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduling loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- tick phases -------------------------------------------------------

    /// Phase 1: complete jobs whose expected runtime elapsed and recount
    /// every node's allocations from its surviving running set.
    async fn complete_running_jobs(&self, state: &mut EngineState) -> Result<()> {
        let nodes = self.storage.get_nodes().await?;
        let now = self.clock.now();
        let mut next = now + SCHEDULING_INTERVAL as f64;
        // A deadline already in the past rolls forward a full interval; the
        // relaxation below pulls it back in if a completion is due sooner.
        if state.next_schedule_time < now {
            state.next_schedule_time = next;
        }

        for mut node in nodes {
            let placed = {
                let index = self.index.read().unwrap();
                index.node_jobs.get(&node.id).cloned().unwrap_or_default()
            };
            let mut completed: Vec<Id> = Vec::new();
            let mut running: Vec<Job> = Vec::new();

            for job_id in &placed {
                let Some(mut job) = self.storage.get_job(job_id).await? else {
                    // Record vanished from storage; drop the dangling placement.
                    self.index.write().unwrap().jobs_nodes.remove(job_id);
                    completed.push(job_id.clone());
                    continue;
                };
                let Some(started_at) = job.started_at else {
                    running.push(job);
                    continue;
                };
                let completion_time = started_at + job.expected_run_time as f64;
                if completion_time < now {
                    job.status = JobStatus::Completed;
                    self.storage.update_job(job).await?;
                    self.index.write().unwrap().jobs_nodes.remove(job_id);
                    completed.push(job_id.clone());
                    info!(job_id = %job_id, node_id = %node.id, "job completed");
                } else {
                    if completion_time < next {
                        next = completion_time;
                    }
                    running.push(job);
                }
            }

            {
                let mut index = self.index.write().unwrap();
                if let Some(placed) = index.node_jobs.get_mut(&node.id) {
                    placed.retain(|id| !completed.contains(id));
                }
            }
            recalc_allocated_resources(&mut node, &running);
            self.storage.update_node(node).await?;
        }

        if state.next_schedule_time > next {
            state.next_schedule_time = next;
        }
        Ok(())
    }

    /// Phase 2: place pending jobs first-fit onto the node snapshot taken
    /// after phase 1's frees.
    async fn schedule_jobs(&self, state: &mut EngineState) -> Result<()> {
        let mut nodes = self.storage.get_nodes().await?;
        let now = self.clock.now();
        let mut next = now + SCHEDULING_INTERVAL as f64;
        if state.next_schedule_time < now {
            state.next_schedule_time = next;
        }

        let mut assigned: Vec<Id> = Vec::new();
        let pending = state.pending_jobs.clone();
        for job_id in &pending {
            let Some(mut job) = self.storage.get_job(job_id).await? else {
                continue;
            };
            let candidate_id = match fit_available(&job, &nodes).first() {
                Some(node) => node.id.clone(),
                None => continue,
            };
            // Re-read the chosen node so its counters include placements
            // made earlier in this same pass.
            let Some(mut node) = self.storage.get_node(&candidate_id).await? else {
                continue;
            };

            self.index
                .write()
                .unwrap()
                .jobs_nodes
                .insert(job_id.clone(), node.id.clone());
            job.status = JobStatus::Running;
            job.started_at = Some(now);
            let expected_run_time = job.expected_run_time;
            let requests_cpu = job.requests_cpu;
            let requests_memory = job.requests_memory;
            self.storage.update_job(job).await?;

            {
                let mut index = self.index.write().unwrap();
                if let Some(placed) = index.node_jobs.get_mut(&node.id) {
                    placed.push(job_id.clone());
                }
            }
            node.jobs_allocated += 1;
            node.cpu_allocated += requests_cpu;
            node.memory_allocated += requests_memory;
            self.storage.update_node(node.clone()).await?;
            // Keep the snapshot in step; the fit check above must see this
            // placement when it considers the next pending job.
            if let Some(snapshot) = nodes.iter_mut().find(|n| n.id == node.id) {
                *snapshot = node.clone();
            }

            let completion_time = now + expected_run_time as f64;
            if completion_time < next {
                next = completion_time;
            }
            assigned.push(job_id.clone());
            info!(job_id = %job_id, node_id = %node.id, "job assigned");
        }

        state.pending_jobs.retain(|id| !assigned.contains(id));
        if state.next_schedule_time > next {
            state.next_schedule_time = next;
        }
        Ok(())
    }
}
