//! Submit outcome and pipeline error taxonomy

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use thiserror::Error;

use crate::logic::alert::AlertEvent;
use crate::logic::features::FeatureVector;
use crate::logic::ingest::{Reading, ValidationError};
use crate::logic::model::{RiskScore, ScoreStatus, ScoringError};
use crate::logic::store::StoreError;

// ============================================================================
// TAXONOMY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Bad input; retrying the same reading will fail again
    ValidationError,
    /// Transient; the reading may be retried
    StoreUnavailable,
    /// Fallback score emitted, pipeline continued
    ScoringUnavailable,
    /// Not an error: not enough history for features yet
    InsufficientHistory,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::StoreUnavailable => "StoreUnavailable",
            ErrorKind::ScoringUnavailable => "ScoringUnavailable",
            ErrorKind::InsufficientHistory => "InsufficientHistory",
            ErrorKind::DeadlineExceeded => "DeadlineExceeded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Validation, order check, reading append
    Ingest,
    /// Window query, features, score, alert
    Scoring,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("reading rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("history store unavailable during {stage:?}: {source}")]
    StoreUnavailable { stage: Stage, source: StoreError },

    #[error("scoring unavailable, fallback used: {0}")]
    ScoringUnavailable(#[from] ScoringError),

    #[error("deadline exceeded during {stage:?}")]
    DeadlineExceeded { stage: Stage },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::ValidationError,
            PipelineError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            PipelineError::ScoringUnavailable(_) => ErrorKind::ScoringUnavailable,
            PipelineError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Validation(_) => Stage::Ingest,
            PipelineError::StoreUnavailable { stage, .. } | PipelineError::DeadlineExceeded { stage } => *stage,
            PipelineError::ScoringUnavailable(_) => Stage::Scoring,
        }
    }
}

/// `{kind, stage, message, details?}`
impl Serialize for PipelineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("PipelineError", 4)?;
        st.serialize_field("kind", &self.kind())?;
        st.serialize_field("stage", &self.stage())?;
        st.serialize_field("message", &self.to_string())?;
        match self {
            PipelineError::Validation(details) => st.serialize_field("details", details)?,
            _ => st.skip_field("details")?,
        }
        st.end()
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// Result of one `submit_reading` call
///
/// `accepted` means the reading was validated and persisted; later stages
/// may still have failed, in which case `error` says which.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub accepted: bool,
    pub reading: Option<Reading>,
    pub features: Option<FeatureVector>,
    pub risk_score: Option<RiskScore>,
    pub alert_event: Option<AlertEvent>,
    pub error: Option<PipelineError>,
}

impl SubmitOutcome {
    pub fn rejected(error: PipelineError) -> Self {
        Self {
            accepted: false,
            reading: None,
            features: None,
            risk_score: None,
            alert_event: None,
            error: Some(error),
        }
    }

    pub fn accepted(reading: Reading) -> Self {
        Self {
            accepted: true,
            reading: Some(reading),
            features: None,
            risk_score: None,
            alert_event: None,
            error: None,
        }
    }

    /// Error kind, or `InsufficientHistory` for an otherwise clean outcome
    /// whose score had too little history
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if let Some(error) = &self.error {
            return Some(error.kind());
        }
        match &self.risk_score {
            Some(score) if score.status == ScoreStatus::InsufficientHistory => Some(ErrorKind::InsufficientHistory),
            _ => None,
        }
    }
}
