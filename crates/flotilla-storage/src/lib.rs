//! `flotilla-storage` — the entity store behind the scheduling engine.
//!
//! The [`Storage`] trait is a uniform key-addressable contract over the two
//! entity kinds (Job, Node): add/get/update/delete plus list-all, with list
//! order defined as insertion order. [`MemoryStore`] is the mandatory
//! backend; `postgresql` and `redis` are recognized kinds whose
//! [`open`] fails loudly instead of pretending to persist.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{Result, StorageError};
pub use memory::MemoryStore;
pub use store::{open, Storage, StorageKind};
