use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{HeartError, Result};

/// Central configuration for training, evaluation and prediction.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input CSV with the feature columns and the target column.
    pub data_path: PathBuf,
    /// Fitted pipeline (binary artifact).
    pub model_path: PathBuf,
    /// Training metadata sidecar (JSON).
    pub metadata_path: PathBuf,
    /// Fraction of rows held out for the test partition.
    pub test_size: f64,
    /// Seed for the stratified train/test split.
    pub random_state: u64,
    /// Number of stratified folds used to score each grid candidate.
    pub cv_folds: usize,

    pub classifier: LogisticConfig,
}

/// Logistic-regression hyper-parameters and the search grid over `C`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct LogisticConfig {
    pub max_iter: u64,
    pub c_grid: Vec<f64>,
    pub penalty: Penalty,
    pub solver: Solver,
}

/// Regularization penalty. Only L2 is supported by the solver.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    #[default]
    L2,
}

/// Optimizer used to fit the classifier.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Solver {
    /// Limited-memory BFGS (quasi-Newton).
    #[default]
    Lbfgs,
}

impl Penalty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Penalty::L2 => "l2",
        }
    }
}

impl Solver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Solver::Lbfgs => "lbfgs",
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Penalty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" => Ok(Penalty::L2),
            _ => Err(format!("Unsupported penalty: {}. Valid options are: l2", s)),
        }
    }
}

impl FromStr for Solver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lbfgs" => Ok(Solver::Lbfgs),
            _ => Err(format!("Unsupported solver: {}. Valid options are: lbfgs", s)),
        }
    }
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            c_grid: vec![0.01, 0.1, 1.0, 10.0],
            penalty: Penalty::L2,
            solver: Solver::Lbfgs,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/heart-disease.csv"),
            model_path: PathBuf::from("models/model_v1.bin"),
            metadata_path: PathBuf::from("models/metadata.json"),
            test_size: 0.3,
            random_state: 42,
            cv_folds: 5,
            classifier: LogisticConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check value ranges that would otherwise surface as confusing failures
    /// deep inside the split or the grid search.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(HeartError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.cv_folds < 2 {
            return Err(HeartError::InvalidConfig(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.classifier.max_iter == 0 {
            return Err(HeartError::InvalidConfig(
                "max_iter must be greater than 0".to_string(),
            ));
        }
        if self.classifier.c_grid.is_empty() {
            return Err(HeartError::InvalidConfig("c_grid is empty".to_string()));
        }
        if let Some(c) = self
            .classifier
            .c_grid
            .iter()
            .find(|c| !(c.is_finite() && **c > 0.0))
        {
            return Err(HeartError::InvalidConfig(format!(
                "every C in c_grid must be a positive finite number, got {}",
                c
            )));
        }
        Ok(())
    }
}

/// Load a pipeline configuration from a JSON file. Missing fields take their
/// default values.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let content =
        std::fs::read_to_string(&path).map_err(|e| HeartError::io(path.as_ref(), e))?;
    let config: PipelineConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.test_size, 0.3);
        assert_eq!(cfg.random_state, 42);
        assert_eq!(cfg.cv_folds, 5);
        assert_eq!(cfg.classifier.max_iter, 1000);
        assert_eq!(cfg.classifier.c_grid, vec![0.01, 0.1, 1.0, 10.0]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"cv_folds": 3, "classifier": {"c_grid": [0.5]}}"#).unwrap();
        assert_eq!(cfg.cv_folds, 3);
        assert_eq!(cfg.classifier.c_grid, vec![0.5]);
        assert_eq!(cfg.classifier.max_iter, 1000);
        assert_eq!(cfg.classifier.penalty, Penalty::L2);
        assert_eq!(cfg.test_size, 0.3);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = PipelineConfig::default();
        cfg.test_size = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.cv_folds = 1;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.classifier.c_grid = vec![1.0, -0.1];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn penalty_and_solver_parse() {
        assert_eq!("L2".parse::<Penalty>().unwrap(), Penalty::L2);
        assert_eq!("lbfgs".parse::<Solver>().unwrap(), Solver::Lbfgs);
        assert!("l1".parse::<Penalty>().is_err());
        assert!("saga".parse::<Solver>().is_err());
    }
}
