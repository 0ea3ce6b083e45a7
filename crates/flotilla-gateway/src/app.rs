use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use flotilla_engine::Scheduler;

use crate::http;

/// Shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }
}

/// Assemble the full Axum router: the `/api/v1` control-plane plus the
/// liveness probe.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/jobs",
            get(http::jobs::list_jobs).post(http::jobs::submit_job),
        )
        .route(
            "/jobs/{id}",
            get(http::jobs::get_job).delete(http::jobs::delete_job),
        )
        .route("/jobs/{id}/status", post(http::jobs::update_job_status))
        .route(
            "/nodes",
            get(http::nodes::list_nodes).post(http::nodes::add_node),
        )
        .route(
            "/nodes/{id}",
            get(http::nodes::get_node).delete(http::nodes::delete_node),
        )
        .route("/nodes/{id}/jobs", get(http::nodes::get_node_jobs));

    Router::new()
        .route("/health", get(http::health::health_handler))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
