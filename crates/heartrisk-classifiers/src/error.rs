use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by data loading, training, persistence and prediction.
#[derive(Debug, Error)]
pub enum HeartError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Required column '{0}' not found in dataset")]
    MissingColumn(String),

    #[error("Row {row}: column '{column}' has non-numeric value '{value}'")]
    ParseValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: unrecognized category '{value}' in column '{column}'")]
    UnknownCategory {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: target value {value} is not a binary label (expected 0 or 1)")]
    InvalidLabel { row: usize, value: f64 },

    #[error("Dataset contains no rows")]
    EmptyDataset,

    #[error("Training data contains a single class; both 0 and 1 labels are required")]
    SingleClass,

    #[error("Expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("Feature '{feature}' must be a finite number, got {value}")]
    NonFiniteFeature { feature: String, value: f64 },

    #[error("Trained model not found at {0}. Run training before requesting predictions.")]
    ModelNotFound(PathBuf),

    #[error("Model artifact {path} has format version {found}, expected {expected}")]
    IncompatibleArtifact {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("Model artifact {path} was trained on features {found:?}, expected {expected:?}")]
    FeatureMismatch {
        path: PathBuf,
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Failed to (de)serialize model artifact: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Failed to (de)serialize metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Logistic regression fit failed: {0}")]
    Training(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HeartError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HeartError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error means no trained model exists yet.
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, HeartError::ModelNotFound(_))
    }

    /// True when the caller supplied an unusable feature vector.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            HeartError::FeatureCount { .. } | HeartError::NonFiniteFeature { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HeartError>;
