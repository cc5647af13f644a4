//! Alert state and score handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use maintai_core::{AlertLevel, AlertState, AlertStats, RiskScore};

use crate::{AppError, AppResult, AppState};

const MAX_SCORE_LIMIT: usize = 1_000;

#[derive(Debug, Default, Deserialize)]
pub struct AlertFilter {
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScoreQuery {
    pub limit: Option<usize>,
}

/// List live alert states, optionally at one level
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> AppResult<Json<Vec<AlertState>>> {
    let states = match filter.level.as_deref() {
        Some(level) => {
            let level: AlertLevel = level.parse().map_err(AppError::ValidationError)?;
            state.engine.alert_states_at_level(level)
        }
        None => state.engine.alert_states(),
    };
    Ok(Json(states))
}

/// Equipment count per alert level
pub async fn stats(State(state): State<AppState>) -> Json<AlertStats> {
    Json(state.engine.alert_stats())
}

/// Alert state of one equipment
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<AlertState>> {
    let alert = state
        .engine
        .alert_state(&id)
        .ok_or_else(|| AppError::NotFound("Equipment not found".to_string()))?;

    Ok(Json(alert))
}

/// Recent risk scores of one equipment, newest first
pub async fn scores(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ScoreQuery>,
) -> AppResult<Json<Vec<RiskScore>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_SCORE_LIMIT);
    let scores = state.engine.recent_scores(&id, limit).await?;
    Ok(Json(scores))
}
