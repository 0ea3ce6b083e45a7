pub mod health;
pub mod jobs;
pub mod nodes;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use flotilla_core::types::Id;
use flotilla_engine::EngineError;

/// `{"status":"ok"}` / `{"status":"error"}` body used by mutating endpoints
/// and error responses.
#[derive(Serialize)]
pub struct StatusReply {
    pub status: &'static str,
}

impl StatusReply {
    pub fn ok() -> Json<Self> {
        Json(Self { status: "ok" })
    }

    pub fn error() -> Json<Self> {
        Json(Self { status: "error" })
    }
}

/// `{"status":"ok","id":"..."}` body returned by the create endpoints.
#[derive(Serialize)]
pub struct CreateReply {
    pub status: &'static str,
    pub id: Id,
}

impl CreateReply {
    pub fn ok(id: Id) -> Json<Self> {
        Json(Self { status: "ok", id })
    }
}

pub(crate) fn not_found() -> (StatusCode, Json<StatusReply>) {
    (StatusCode::NOT_FOUND, StatusReply::error())
}

pub(crate) fn bad_request() -> (StatusCode, Json<StatusReply>) {
    (StatusCode::BAD_REQUEST, StatusReply::error())
}

/// Only the storage seam can fail an engine call; the in-memory backend
/// never does, but the route still needs a mapping.
pub(crate) fn internal_error(err: EngineError) -> (StatusCode, Json<StatusReply>) {
    tracing::error!("engine call failed: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, StatusReply::error())
}
