//! `flotilla-engine` — the cluster scheduling core.
//!
//! # Overview
//!
//! The [`engine::Scheduler`] owns the placement indexes linking jobs and
//! nodes, the FIFO pending queue, and the next-tick clock. The HTTP
//! control-plane and the background loop call into it concurrently; one
//! engine-wide async lock serializes every mutating path, held across the
//! storage calls of each operation so index and record change together.
//! The indexes themselves sit behind a separate read-write lock, so query
//! paths read them without waiting on an in-flight writer.
//!
//! # Tick
//!
//! A driver invokes [`engine::Scheduler::tick`] about once per second. When
//! `next_schedule_time` has arrived the tick runs two phases in order:
//! completion (jobs whose expected runtime elapsed, with an authoritative
//! recount of every node's allocations) and placement (first-fit assignment
//! of pending jobs). Any state-changing API call drags `next_schedule_time`
//! to "now" so the loop reacts on its next pass.

pub mod clock;
pub mod engine;
pub mod error;
pub mod placement;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Scheduler, SCHEDULING_INTERVAL};
pub use error::{EngineError, Result};
