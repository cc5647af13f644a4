//! Reading ingest handlers

use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use maintai_core::{ErrorKind, RawReading, Stage, SubmitOutcome};

use crate::models::{BatchReadingsRequest, BatchReadingsResponse, SensorOutcome, SubmitParams};
use crate::{AppResult, AppState};

/// HTTP status for a submit outcome
///
/// Accepted readings are 200 even when a later stage degraded; the body
/// carries the error. Rejections map to 422 (bad reading) or 503 (store
/// down before the reading was persisted).
pub fn outcome_status(outcome: &SubmitOutcome) -> StatusCode {
    if outcome.accepted {
        return StatusCode::OK;
    }
    match outcome.error.as_ref().map(|e| (e.kind(), e.stage())) {
        Some((ErrorKind::ValidationError, _)) => StatusCode::UNPROCESSABLE_ENTITY,
        Some((ErrorKind::StoreUnavailable, Stage::Ingest)) => StatusCode::SERVICE_UNAVAILABLE,
        Some((ErrorKind::DeadlineExceeded, _)) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Submit one reading
pub async fn submit(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
    Json(raw): Json<RawReading>,
) -> (StatusCode, Json<SubmitOutcome>) {
    let deadline = params.deadline_ms.map(Duration::from_millis);
    let outcome = state.engine.submit_reading_with_deadline(raw, deadline).await;

    if let Some(event) = &outcome.alert_event {
        tracing::info!(equipment = %event.equipment_id, "{}", event.summary());
    }

    (outcome_status(&outcome), Json(outcome))
}

/// Submit every sensor of one machine message
///
/// Sensors are submitted in order; each gets its own outcome.
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchReadingsRequest>,
) -> AppResult<Json<BatchReadingsResponse>> {
    req.validate()?;

    let equipment_id = req.equipment_id.clone();
    let received_at = serde_json::Value::String(chrono::Utc::now().to_rfc3339());

    let mut results = Vec::with_capacity(req.sensors.len());
    for (sensor, raw) in req.into_readings(received_at) {
        let outcome = state.engine.submit_reading(raw).await;
        results.push(SensorOutcome {
            sensor_id: sensor.sensor_id,
            metric_name: sensor.metric_name,
            outcome,
        });
    }

    let accepted = results.iter().filter(|r| r.outcome.accepted).count();
    tracing::debug!(
        equipment = %equipment_id,
        "Batch: {} accepted, {} rejected",
        accepted,
        results.len() - accepted
    );

    Ok(Json(BatchReadingsResponse {
        equipment_id,
        accepted,
        rejected: results.len() - accepted,
        results,
    }))
}
