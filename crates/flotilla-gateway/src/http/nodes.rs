//! Node endpoints under /api/v1.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use flotilla_core::types::{ActionStatus, Job, NewNode, Node};

use super::{internal_error, not_found, CreateReply, StatusReply};
use crate::app::AppState;

/// GET /api/v1/nodes — all node records.
pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Node>>, (StatusCode, Json<StatusReply>)> {
    match state.scheduler.get_nodes().await {
        Ok(nodes) => Ok(Json(nodes)),
        Err(e) => Err(internal_error(e)),
    }
}

/// POST /api/v1/nodes — register a node; 201 with the allocated id.
pub async fn add_node(
    State(state): State<Arc<AppState>>,
    Json(new_node): Json<NewNode>,
) -> Result<(StatusCode, Json<CreateReply>), (StatusCode, Json<StatusReply>)> {
    match state.scheduler.add_node(new_node).await {
        Ok(id) => Ok((StatusCode::CREATED, CreateReply::ok(id))),
        Err(e) => Err(internal_error(e)),
    }
}

/// GET /api/v1/nodes/{id} — one node record, 404 when unknown.
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(node_id): Path<String>,
) -> Result<Json<Node>, (StatusCode, Json<StatusReply>)> {
    match state.scheduler.get_node(&node_id).await {
        Ok(Some(node)) => Ok(Json(node)),
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal_error(e)),
    }
}

/// GET /api/v1/nodes/{id}/jobs — the jobs currently placed on a node.
/// A node the engine does not know is 404; a known node with nothing
/// placed answers 200 with an empty list.
pub async fn get_node_jobs(
    State(state): State<Arc<AppState>>,
    Path(node_id): Path<String>,
) -> Result<Json<Vec<Job>>, (StatusCode, Json<StatusReply>)> {
    match state.scheduler.get_node_jobs(&node_id).await {
        Ok(Some(jobs)) => Ok(Json(jobs)),
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal_error(e)),
    }
}

/// DELETE /api/v1/nodes/{id} — remove a node, requeueing its running jobs.
pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    Path(node_id): Path<String>,
) -> Result<Json<StatusReply>, (StatusCode, Json<StatusReply>)> {
    match state.scheduler.delete_node(&node_id).await {
        Ok(ActionStatus::Ok) => Ok(StatusReply::ok()),
        Ok(ActionStatus::NotFound) => Err(not_found()),
        Err(e) => Err(internal_error(e)),
    }
}
