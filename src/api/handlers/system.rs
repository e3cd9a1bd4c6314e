use axum::{extract::State, Json};

use crate::api::{state::AppState, types::*};

/// GET / -- static service description
pub async fn home(State(state): State<AppState>) -> String {
    state
        .greeting
        .as_deref()
        .unwrap_or_default()
        .to_string()
}

/// GET /health -- liveness probe with the loaded model's shape
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
        layout: state.layout.name().to_string(),
        model: ModelSummary::of(state.model.as_ref()),
    })
}
