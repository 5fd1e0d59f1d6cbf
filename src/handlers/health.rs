use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::{AppState, ServiceState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Whether a persisted bundle is on disk, not whether it is in memory.
    pub model_loaded: bool,
    pub ready: bool,
    pub state: String,
    pub scoring_faults: u64,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let service_state = state.service_state();
    let ready = state.is_ready();
    let status = match service_state {
        ServiceState::Ready if ready => "healthy",
        ServiceState::Shutdown => "shutting_down",
        _ => "initializing",
    };

    Json(HealthResponse {
        status: status.to_string(),
        model_loaded: state.store.exists(),
        ready,
        state: service_state.to_string(),
        scoring_faults: state.scoring().map(|s| s.fault_count()).unwrap_or(0),
    })
}
