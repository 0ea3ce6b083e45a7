//! `flotilla-gateway` — HTTP control-plane over the scheduling engine.
//!
//! REST endpoints under `/api/v1` translate requests into engine calls and
//! engine verdicts into status codes; `/health` is a bare liveness probe.
//! The binary wires CLI flags, config, storage and the background loop
//! together.

pub mod app;
pub mod http;

pub use app::{build_router, AppState};
