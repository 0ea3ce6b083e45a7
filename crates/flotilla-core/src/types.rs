use serde::{Deserialize, Serialize};

/// Entity identifier. Opaque to callers; the engine allocates decimal strings
/// from per-kind monotonic counters.
pub type Id = String;

/// Outcome of a state-mutating operation against the engine or storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Ok,
    NotFound,
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, awaiting placement.
    New,
    /// Placed on a node and consuming its resources.
    Running,
    /// Expected run time elapsed.
    Completed,
    /// Stopped by an explicit terminate call.
    Terminated,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::New => "new",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Terminated => "terminated",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "new" => Ok(JobStatus::New),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "terminated" => Ok(JobStatus::Terminated),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Job submission body. Resource requests are copied verbatim onto the
/// created record; no validation is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Simulated runtime in seconds.
    pub expected_run_time: u64,
    pub requests_cpu: f64,
    pub requests_memory: i64,
}

/// A persisted job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Id,
    pub status: JobStatus,
    pub expected_run_time: u64,
    pub requests_cpu: f64,
    pub requests_memory: i64,
    /// Wall-clock seconds at submission.
    pub created_at: f64,
    /// Wall-clock seconds at placement. Set while running and after
    /// completion; cleared when a node deletion requeues the job.
    pub started_at: Option<f64>,
}

/// Node registration body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNode {
    pub jobs_capacity: u32,
    pub cpu_capacity: f64,
    pub memory_capacity: i64,
}

/// A persisted node record. The three `*_allocated` counters track the jobs
/// currently running on the node and never exceed the matching capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Id,
    pub jobs_capacity: u32,
    pub jobs_allocated: u32,
    pub cpu_capacity: f64,
    pub cpu_allocated: f64,
    pub memory_capacity: i64,
    pub memory_allocated: i64,
}
