//! `flotilla-core` — shared entity model, configuration and errors.
//!
//! Everything the storage adapter, the scheduling engine and the HTTP
//! gateway agree on lives here: the [`types::Job`] / [`types::Node`]
//! records, the two-value [`types::ActionStatus`] verdict, and the
//! figment-layered [`config::FlotillaConfig`].

pub mod config;
pub mod error;
pub mod types;

pub use config::FlotillaConfig;
pub use error::{CoreError, Result};
pub use types::{ActionStatus, Id, Job, JobStatus, NewJob, NewNode, Node};
