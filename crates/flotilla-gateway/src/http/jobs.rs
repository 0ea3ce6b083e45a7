//! Job endpoints under /api/v1.
//!
//! Submission and deletion answer with the two-value `ok`/`error` bodies;
//! the status route accepts `?action=terminate` and rejects anything else
//! with 400.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use flotilla_core::types::{ActionStatus, Job, NewJob};

use super::{bad_request, internal_error, not_found, CreateReply, StatusReply};
use crate::app::AppState;

/// GET /api/v1/jobs — all job records.
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Job>>, (StatusCode, Json<StatusReply>)> {
    match state.scheduler.get_jobs().await {
        Ok(jobs) => Ok(Json(jobs)),
        Err(e) => Err(internal_error(e)),
    }
}

/// POST /api/v1/jobs — submit a job; 201 with the allocated id.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(new_job): Json<NewJob>,
) -> Result<(StatusCode, Json<CreateReply>), (StatusCode, Json<StatusReply>)> {
    match state.scheduler.submit_job(new_job).await {
        Ok(id) => Ok((StatusCode::CREATED, CreateReply::ok(id))),
        Err(e) => Err(internal_error(e)),
    }
}

/// GET /api/v1/jobs/{id} — one job record, 404 when unknown.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, (StatusCode, Json<StatusReply>)> {
    match state.scheduler.get_job(&job_id).await {
        Ok(Some(job)) => Ok(Json(job)),
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal_error(e)),
    }
}

/// DELETE /api/v1/jobs/{id}.
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusReply>, (StatusCode, Json<StatusReply>)> {
    match state.scheduler.delete_job(&job_id).await {
        Ok(ActionStatus::Ok) => Ok(StatusReply::ok()),
        Ok(ActionStatus::NotFound) => Err(not_found()),
        Err(e) => Err(internal_error(e)),
    }
}

#[derive(Deserialize)]
pub struct StatusAction {
    pub action: String,
}

/// POST /api/v1/jobs/{id}/status?action=terminate — stop a running job.
/// Unknown actions are 400; terminating anything not running is 404.
pub async fn update_job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Query(query): Query<StatusAction>,
) -> Result<Json<StatusReply>, (StatusCode, Json<StatusReply>)> {
    match query.action.as_str() {
        "terminate" => match state.scheduler.terminate_job(&job_id).await {
            Ok(ActionStatus::Ok) => Ok(StatusReply::ok()),
            Ok(ActionStatus::NotFound) => Err(not_found()),
            Err(e) => Err(internal_error(e)),
        },
        _ => Err(bad_request()),
    }
}
