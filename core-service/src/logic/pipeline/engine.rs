//! Engine - the `submit_reading` pipeline
//!
//! ```text
//! validate ─► [equipment lock] ─► order check ─► append reading      (ingest)
//!          ─► query window ─► features ─► score ─► append score      (scoring)
//!          ─► alert evaluation ─► notifier queue                    (sync)
//! ```
//!
//! The caller deadline only covers the async scoring stage. Alert
//! evaluation runs after the last await, so a transition and its event are
//! never split by a cancelled future.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::clock::{Clock, SystemClock};
use super::keyed::{EquipmentLocks, StreamCursor};
use super::outcome::{PipelineError, Stage, SubmitOutcome};
use crate::constants;
use crate::logic::alert::{AlertEvaluator, AlertLevel, AlertState, AlertStats};
use crate::logic::config::{ConfigError, EngineConfig};
use crate::logic::features::{FeatureComputer, FeatureVector};
use crate::logic::ingest::{check_sequence, validate, MetricSchema, RawReading, Reading};
use crate::logic::model::{self, ModelError, RiskScore, RiskScorer, ScoreOutcome, ScoringStrategy};
use crate::logic::notify::{LogNotifier, NotificationDispatcher, Notifier};
use crate::logic::store::{HistoryRecord, HistoryStore, MemoryHistoryStore, StoreError, TimedStore};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot load scoring model: {0}")]
    Model(#[from] ModelError),

    #[error("cannot start notification worker: {0}")]
    Notifier(#[from] std::io::Error),
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn HistoryStore>>,
    strategy: Option<Arc<dyn ScoringStrategy>>,
    notifiers: Vec<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    /// History store; in-memory when not set
    pub fn store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Scoring strategy; overrides `config.scoring`
    pub fn strategy(mut self, strategy: Arc<dyn ScoringStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Add a notifier; a `LogNotifier` is used when none is added
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        self.config.validate()?;
        let config = Arc::new(self.config);
        let schema = Arc::new(MetricSchema::new(config.metrics.clone()).map_err(ConfigError::Invalid)?);

        let strategy = match self.strategy {
            Some(strategy) => strategy,
            None => model::strategy_from_config(&config.scoring)?,
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryHistoryStore::new()) as Arc<dyn HistoryStore>);
        let mut notifiers = self.notifiers;
        if notifiers.is_empty() {
            notifiers.push(Arc::new(LogNotifier));
        }

        log::info!(
            "{} engine v{} ready: strategy={}, window={}, k={}, warn={}, crit={}, notifiers={}",
            constants::APP_NAME,
            constants::APP_VERSION,
            strategy.name(),
            config.window_size,
            config.consecutive_count,
            config.warn_threshold,
            config.crit_threshold,
            notifiers.iter().map(|n| n.name()).collect::<Vec<_>>().join(",")
        );

        Ok(Engine {
            store: TimedStore::new(store, config.store_timeout()),
            features: FeatureComputer::new(Arc::clone(&config), Arc::clone(&schema)),
            scorer: RiskScorer::new(strategy, config.fallback_score),
            alerts: AlertEvaluator::new(config.alert_policy()),
            dispatcher: NotificationDispatcher::start(notifiers, config.notify_queue_capacity)?,
            locks: EquipmentLocks::default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            schema,
            config,
        })
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    config: Arc<EngineConfig>,
    schema: Arc<MetricSchema>,
    store: TimedStore,
    features: FeatureComputer,
    scorer: RiskScorer,
    alerts: AlertEvaluator,
    dispatcher: NotificationDispatcher,
    locks: EquipmentLocks,
    clock: Arc<dyn Clock>,
}

/// Output of the async scoring stage
struct Scored {
    features: FeatureVector,
    score: RiskScore,
    error: Option<PipelineError>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            store: None,
            strategy: None,
            notifiers: Vec::new(),
            clock: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &str {
        self.scorer.strategy_name()
    }

    pub async fn submit_reading(&self, raw: RawReading) -> SubmitOutcome {
        self.submit_reading_with_deadline(raw, None).await
    }

    /// Run one reading through the pipeline
    ///
    /// `deadline` is measured from the call and covers the equipment lock
    /// wait, ingest and scoring. Expiring before the reading is persisted
    /// rejects it with `DeadlineExceeded` at ingest; an append already handed
    /// to the store may still land, and a retry then reports a duplicate.
    /// Expiring after ingest yields `accepted` with `DeadlineExceeded` at
    /// scoring.
    pub async fn submit_reading_with_deadline(&self, raw: RawReading, deadline: Option<Duration>) -> SubmitOutcome {
        let expires = deadline.map(|limit| tokio::time::Instant::now() + limit);

        let reading = match validate(&raw, &self.schema, &self.config, self.clock.now()) {
            Ok(reading) => reading,
            Err(e) => {
                log::debug!("Rejected reading: {}", e);
                return SubmitOutcome::rejected(PipelineError::Validation(e));
            }
        };

        let cursor = self.locks.cursor(&reading.equipment_id);
        let ingest = async {
            let mut guard = cursor.lock().await;
            self.ingest(&mut guard, &reading).await.map(|()| guard)
        };
        let ingested = match expires {
            Some(at) => tokio::time::timeout_at(at, ingest)
                .await
                .unwrap_or(Err(PipelineError::DeadlineExceeded { stage: Stage::Ingest })),
            None => ingest.await,
        };
        // Held until the alert state is updated
        let _guard = match ingested {
            Ok(guard) => guard,
            Err(e) => {
                log::debug!("{}/{} not accepted: {}", reading.equipment_id, reading.metric_name, e);
                return SubmitOutcome::rejected(e);
            }
        };
        let mut outcome = SubmitOutcome::accepted(reading.clone());

        let scoring = self.scoring_stage(&reading);
        let result = match expires {
            Some(at) => match tokio::time::timeout_at(at, scoring).await {
                Ok(result) => result,
                Err(_) => {
                    log::warn!(
                        "{}/{} deadline exceeded after ingest",
                        reading.equipment_id,
                        reading.metric_name
                    );
                    outcome.error = Some(PipelineError::DeadlineExceeded { stage: Stage::Scoring });
                    return outcome;
                }
            },
            None => scoring.await,
        };

        let scored = match result {
            Ok(scored) => scored,
            Err(e) => {
                outcome.error = Some(e);
                return outcome;
            }
        };

        // No await past this point
        let event = self.alerts.evaluate(&scored.score);
        if let Some(event) = &event {
            self.dispatcher.dispatch(event);
        }

        outcome.features = Some(scored.features);
        outcome.risk_score = Some(scored.score);
        outcome.alert_event = event;
        outcome.error = scored.error;
        outcome
    }

    async fn ingest(&self, cursor: &mut StreamCursor, reading: &Reading) -> Result<(), PipelineError> {
        let cached = cursor.last(&reading.metric_name).map(|last| last.cloned());
        let last = match cached {
            Some(last) => last,
            None => self
                .store
                .latest_reading(&reading.equipment_id, &reading.metric_name)
                .await
                .map_err(|source| PipelineError::StoreUnavailable { stage: Stage::Ingest, source })?,
        };

        check_sequence(reading, last.as_ref())?;

        // An append that times out or is abandoned may still land; until it
        // is confirmed the stream re-seeds from the store
        cursor.forget(&reading.metric_name);
        self.store
            .append(HistoryRecord::Reading(reading.clone()))
            .await
            .map_err(|source| PipelineError::StoreUnavailable { stage: Stage::Ingest, source })?;
        cursor.record(reading.clone());
        Ok(())
    }

    async fn scoring_stage(&self, reading: &Reading) -> Result<Scored, PipelineError> {
        let window = self.features.window_for(reading);
        let history = self
            .store
            .query_window(&reading.equipment_id, &reading.metric_name, window)
            .await
            .map_err(|source| PipelineError::StoreUnavailable { stage: Stage::Scoring, source })?;

        let features = self.features.compute(reading, &history);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Features: {}", features.to_log_entry());
        }
        let ScoreOutcome { score, error } = self.scorer.score(&features);
        let mut error = error.map(PipelineError::ScoringUnavailable);

        if let Err(source) = self.store.append(HistoryRecord::Score(score.clone())).await {
            log::warn!(
                "Score for {}/{} not persisted: {}",
                score.equipment_id,
                score.metric_name,
                source
            );
            error.get_or_insert(PipelineError::StoreUnavailable { stage: Stage::Scoring, source });
        }

        Ok(Scored { features, score, error })
    }

    // ========================================================================
    // READ SIDE
    // ========================================================================

    pub fn alert_state(&self, equipment_id: &str) -> Option<AlertState> {
        self.alerts.state(equipment_id)
    }

    pub fn alert_states(&self) -> Vec<AlertState> {
        self.alerts.states()
    }

    pub fn alert_states_at_level(&self, level: AlertLevel) -> Vec<AlertState> {
        self.alerts.states_at_level(level)
    }

    pub fn alert_stats(&self) -> AlertStats {
        self.alerts.stats()
    }

    /// Newest first
    pub async fn recent_scores(&self, equipment_id: &str, limit: usize) -> Result<Vec<RiskScore>, StoreError> {
        self.store.recent_scores(equipment_id, limit).await
    }

    /// Alert events dropped because the notifier queue was full
    pub fn notifications_dropped(&self) -> u64 {
        self.dispatcher.dropped()
    }

    pub fn notifications_delivered(&self) -> u64 {
        self.dispatcher.delivered()
    }
}
