//! Single-record inference.
//!
//! `make_prediction` reloads the persisted model on every call. Long-lived
//! callers (the HTTP server) load once and hold a `Predictor` instead.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactStore;
use crate::error::Result;
use crate::features::PatientRecord;
use crate::models::{HeartRiskPipeline, ProbabilisticClassifier};

/// Probability at or above which a record is labelled positive.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Upper bound (exclusive) of the low risk band.
pub const LOW_RISK_UPPER: f64 = 0.3;
/// Upper bound (exclusive) of the moderate risk band.
pub const MODERATE_RISK_UPPER: f64 = 0.7;

pub fn label_for_probability(probability: f64) -> usize {
    usize::from(probability >= DECISION_THRESHOLD)
}

/// Ordered risk bands over the positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[0, 0.3)` low, `[0.3, 0.7)` moderate, `[0.7, 1]` high.
pub fn risk_bucket(probability: f64) -> RiskLevel {
    if probability < LOW_RISK_UPPER {
        RiskLevel::Low
    } else if probability < MODERATE_RISK_UPPER {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

/// Round to 4 decimal places for presentation.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Response shape of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: u8,
    /// Positive-class probability rounded to 4 decimal places.
    pub probability: f64,
    pub risk_level: RiskLevel,
}

impl Prediction {
    /// Label and risk band come from the unrounded probability.
    pub fn from_probability(probability: f64) -> Self {
        Self {
            prediction: label_for_probability(probability) as u8,
            probability: round4(probability),
            risk_level: risk_bucket(probability),
        }
    }
}

/// Generate a label and positive-class probability for one patient.
///
/// `features` must hold exactly 7 finite values in model column order. The
/// model is reloaded from `store` on every call.
pub fn make_prediction(store: &ArtifactStore, features: &[f64]) -> Result<(u8, f64)> {
    let record = PatientRecord::from_slice(features)?;
    let model = store.load_model()?;
    let probability = model.predict_proba_one(&record.to_array())?;
    log::debug!("{} predicted p={:.4}", model.name(), probability);
    Ok((label_for_probability(probability) as u8, probability))
}

/// Immutable, cheaply clonable handle to a loaded model.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<HeartRiskPipeline>,
}

impl Predictor {
    pub fn new(model: HeartRiskPipeline) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    pub fn load(store: &ArtifactStore) -> Result<Self> {
        Ok(Self::new(store.load_model()?))
    }

    pub fn model(&self) -> &HeartRiskPipeline {
        &self.model
    }

    pub fn predict(&self, record: &PatientRecord) -> Result<Prediction> {
        let probability = self.model.predict_proba_one(&record.to_array())?;
        Ok(Prediction::from_probability(probability))
    }
}
