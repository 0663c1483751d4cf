//! Re-scoring a persisted model against the full dataset.
use serde::Serialize;

use crate::artifact::{ArtifactStore, TrainingMetadata};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::features::{load_data, split_features_target};
use crate::metrics::{roc_auc_score, ClassificationReport};
use crate::models::ProbabilisticClassifier;

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub n_samples: usize,
    pub roc_auc: f64,
    pub report: ClassificationReport,
    /// Metadata written by the last training run, if any.
    pub metadata: Option<TrainingMetadata>,
}

/// Evaluate the saved model on the whole dataset and print the results.
///
/// The rows include those the model was trained on, so the numbers are
/// optimistic; they are a sanity check, not a generalization estimate.
pub fn evaluate_model(config: &PipelineConfig) -> Result<EvaluationReport> {
    let store = ArtifactStore::from_config(config);
    let model = store.load_model()?;

    let table = load_data(&config.data_path)?;
    let (x, y) = split_features_target(&table)?;
    let y_true = y.to_vec();

    let proba = model.predict_proba(x.view());
    let roc_auc = roc_auc_score(&y_true, &proba.to_vec())?;
    let report = ClassificationReport::new(&y_true, &model.predict(x.view()).to_vec());
    log::info!("Evaluated {} rows, ROC-AUC {:.4}", y_true.len(), roc_auc);

    println!("ROC-AUC (full dataset): {:.4}", roc_auc);
    println!("{}", report);

    let metadata = store.load_metadata()?;
    match &metadata {
        Some(meta) => {
            println!("\nSaved training metadata:");
            println!("{}", serde_json::to_string_pretty(meta)?);
        }
        None => log::warn!(
            "No training metadata found at {}",
            store.metadata_path().display()
        ),
    }

    Ok(EvaluationReport {
        n_samples: y_true.len(),
        roc_auc,
        report,
        metadata,
    })
}
