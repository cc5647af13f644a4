//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    environment: String,
    strategy: String,
    tracked_equipment: usize,
    notifications_delivered: u64,
    notifications_dropped: u64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        environment: state.config.environment.clone(),
        strategy: state.engine.strategy_name().to_string(),
        tracked_equipment: state.engine.alert_states().len(),
        notifications_delivered: state.engine.notifications_delivered(),
        notifications_dropped: state.engine.notifications_dropped(),
    })
}
