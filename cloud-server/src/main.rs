//! MaintAI Backend Server
//!
//! HTTP front for the MaintAI scoring engine: PLC gateways push readings,
//! dashboards read alert states and recent risk scores.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MAINTAI SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐      ┌───────────────────────────────────┐   │
//! │  │  API      │ ───► │  maintai_core::Engine             │   │
//! │  │  (Axum)   │      │  ingest ► features ► score ► alert│   │
//! │  └───────────┘      └────────┬───────────────┬──────────┘   │
//! │                              ▼               ▼              │
//! │                     ┌──────────────┐  ┌─────────────┐       │
//! │                     │ SQLite / mem │  │  Webhooks   │       │
//! │                     └──────────────┘  └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod models;
mod handlers;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maintai_core::logic::notify::{LogNotifier, WebhookConfig, WebhookNotifier, WebhookPlatform};
use maintai_core::logic::store::SqliteHistoryStore;
use maintai_core::Engine;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; `log` records from the engine are forwarded too
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "maintai_server=debug,maintai_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("MaintAI Server starting ({})...", config.environment);

    let engine = build_engine(&config)?;

    // Build application state
    let state = AppState {
        engine: Arc::new(engine),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<config::Config>,
}

fn build_engine(config: &config::Config) -> anyhow::Result<Engine> {
    let engine_config = config.engine_config().context("engine configuration")?;
    let mut builder = Engine::builder(engine_config).notifier(Arc::new(LogNotifier));

    match &config.history_db_path {
        Some(path) => {
            tracing::info!("History: {}", path.display());
            let store = SqliteHistoryStore::open(path)
                .with_context(|| format!("opening history database {}", path.display()))?;
            builder = builder.store(Arc::new(store));
        }
        None => {
            if config.is_production() {
                tracing::warn!("HISTORY_DB_PATH not set; history is kept in memory only");
            } else {
                tracing::info!("History: in-memory");
            }
        }
    }

    if let Some(url) = &config.webhook_url {
        let platform: WebhookPlatform = config
            .webhook_platform
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        tracing::info!("Alert webhook enabled ({})", platform);
        builder = builder.notifier(Arc::new(WebhookNotifier::new(WebhookConfig::new(
            "default",
            url.clone(),
            platform,
        ))));
    }

    Ok(builder.build()?)
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Ingest
        .route("/api/v1/readings", post(handlers::readings::submit))
        .route("/api/v1/readings/batch", post(handlers::readings::submit_batch))

        // Alerts & scores
        .route("/api/v1/alerts", get(handlers::alerts::list))
        .route("/api/v1/alerts/stats", get(handlers::alerts::stats))
        .route("/api/v1/equipment/:id/alert", get(handlers::alerts::get))
        .route("/api/v1/equipment/:id/scores", get(handlers::alerts::scores))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use maintai_core::EngineConfig;

    fn app_with(engine_config: EngineConfig) -> Router {
        let engine = Engine::builder(engine_config).build().unwrap();
        create_router(AppState {
            engine: Arc::new(engine),
            config: Arc::new(config::Config::default()),
        })
    }

    fn app() -> Router {
        app_with(EngineConfig {
            window_size: 2,
            ..Default::default()
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn minutes_ago(m: i64) -> String {
        (Utc::now() - Duration::minutes(m)).to_rfc3339()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["strategy"], "rule_based");
        assert_eq!(body["notifications_delivered"], 0);
    }

    #[tokio::test]
    async fn test_submit_reading() {
        let app = app();
        let reading = json!({
            "machine_id": "press-01",
            "timestamp": minutes_ago(2),
            "type": "temperature",
            "value": 42.0
        });

        let (status, body) = send(&app, Method::POST, "/api/v1/readings", Some(reading)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], true);
        assert_eq!(body["risk_score"]["status"], "insufficient_history");
        assert_eq!(body["reading"]["metric_name"], "temperature");

        let (status, body) = send(&app, Method::GET, "/api/v1/equipment/press-01/alert", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["level"], "NORMAL");
    }

    #[tokio::test]
    async fn test_rejected_reading_is_422() {
        let reading = json!({
            "equipment_id": "press-01",
            "timestamp": minutes_ago(1),
            "metric_name": "voltage",
            "value": 230.0
        });

        let (status, body) = send(&app(), Method::POST, "/api/v1/readings", Some(reading)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["accepted"], false);
        assert_eq!(body["error"]["kind"], "ValidationError");
        assert_eq!(body["error"]["details"]["reason"], "unknown_metric");
    }

    #[tokio::test]
    async fn test_batch_submission() {
        let app = app();
        let batch = json!({
            "device_id": "press-02",
            "timestamp": minutes_ago(3),
            "measurements": [
                {"id": "t1", "parameter": "temp", "reading": 35.5},
                {"id": "v1", "type": "vibration", "value": "4.5"},
                {"id": "x1", "type": "voltage", "value": 1.0}
            ]
        });

        let (status, body) = send(&app, Method::POST, "/api/v1/readings/batch", Some(batch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["equipment_id"], "press-02");
        assert_eq!(body["accepted"], 2);
        assert_eq!(body["rejected"], 1);
        assert_eq!(body["results"][2]["sensor_id"], "x1");
        assert_eq!(body["results"][2]["error"]["kind"], "ValidationError");
    }

    #[tokio::test]
    async fn test_empty_batch_is_400() {
        let batch = json!({"machine_id": "press-02", "sensors": []});
        let (status, body) = send(&app(), Method::POST, "/api/v1/readings/batch", Some(batch)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_unknown_equipment_is_404() {
        let (status, body) = send(&app(), Method::GET, "/api/v1/equipment/nope/alert", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Equipment not found");
    }

    #[tokio::test]
    async fn test_alert_listing_and_scores() {
        let app = app_with(EngineConfig {
            window_size: 1,
            consecutive_count: 1,
            ..Default::default()
        });

        // far above the operating range of vibration
        for (i, value) in [95.0, 98.0].iter().enumerate() {
            let reading = json!({
                "equipment_id": "fan-9",
                "timestamp": minutes_ago(10 - i as i64),
                "metric_name": "vibration",
                "value": value
            });
            let (status, _) = send(&app, Method::POST, "/api/v1/readings", Some(reading)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, Method::GET, "/api/v1/alerts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = send(&app, Method::GET, "/api/v1/alerts?level=normal", None).await;
        assert!(body.as_array().unwrap().is_empty());

        let (status, _) = send(&app, Method::GET, "/api/v1/alerts?level=purple", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, "/api/v1/alerts/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["critical"], 1);
        assert_eq!(body["normal"], 0);

        let (status, body) = send(&app, Method::GET, "/api/v1/equipment/fan-9/scores?limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["strategy"], "rule_based");
        assert_eq!(body[0]["time_to_failure_hours"], 24);
        assert!(!body[0]["contributing_factors"].as_array().unwrap().is_empty());
    }
}
