//! Model-based scoring
//!
//! Delegates to an injected prediction function. The function must be
//! deterministic; its output is range-checked by `RiskScorer`.

use std::path::Path;
use std::sync::Arc;

use super::artifact::{LinearModel, ModelError};
use super::scorer::{scored, RiskScore, ScoringError, ScoringStrategy};
use crate::logic::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub score: f64,
    pub confidence: f64,
}

pub type PredictFn = dyn Fn(&FeatureVector) -> Result<Prediction, ScoringError> + Send + Sync;

#[derive(Clone)]
pub struct ModelBasedScorer {
    name: String,
    predict: Arc<PredictFn>,
}

impl ModelBasedScorer {
    pub fn new<F>(name: impl Into<String>, predict: F) -> Self
    where
        F: Fn(&FeatureVector) -> Result<Prediction, ScoringError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predict: Arc::new(predict),
        }
    }

    pub fn from_model(model: LinearModel) -> Self {
        let name = format!("model:{}", model.name);
        Self::new(name, move |fv| model.predict(fv))
    }

    pub fn from_artifact(path: &Path, sha256: Option<&str>) -> Result<Self, ModelError> {
        Ok(Self::from_model(LinearModel::load(path, sha256)?))
    }
}

impl ScoringStrategy for ModelBasedScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, features: &FeatureVector) -> Result<RiskScore, ScoringError> {
        let prediction = (self.predict)(features)?;
        Ok(scored(features, prediction.score, prediction.confidence, &self.name))
    }
}
