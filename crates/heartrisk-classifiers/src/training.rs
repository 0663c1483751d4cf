//! End-to-end training run.
use std::path::PathBuf;

use ndarray::Axis;

use crate::artifact::{ArtifactStore, TrainingMetadata};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::features::{load_data, split_features_target};
use crate::metrics::{roc_auc_score, ClassificationReport};
use crate::model_selection::{grid_search_cv, train_test_split_stratified, GridSearchResult};
use crate::models::{HeartRiskPipeline, LogisticParams, ProbabilisticClassifier};

/// Everything a training run produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: HeartRiskPipeline,
    pub grid: GridSearchResult,
    /// ROC-AUC of the refit winner on the held-out test partition.
    pub test_roc_auc: f64,
    pub test_report: ClassificationReport,
    pub n_train: usize,
    pub n_test: usize,
    /// Positive-class count in the test partition.
    pub n_test_positive: usize,
    pub metadata: TrainingMetadata,
    pub model_path: PathBuf,
}

/// Candidate grid built from the configured `C` values.
pub fn build_param_grid(config: &PipelineConfig) -> Vec<LogisticParams> {
    LogisticParams::grid(&config.classifier)
}

/// Train the logistic regression model and persist artifacts to disk.
///
/// Loads the dataset, holds out a stratified test partition, grid-searches
/// `C` by cross-validated ROC-AUC on the training partition, refits the
/// winner, reports held-out metrics on stdout and writes the model followed
/// by its metadata. The persisted `roc_auc` is the cross-validation score of
/// the winner, not the held-out score.
pub fn train(config: &PipelineConfig) -> Result<TrainingOutcome> {
    config.validate()?;

    let table = load_data(&config.data_path)?;
    let (x, y) = split_features_target(&table)?;
    log::info!(
        "Loaded {} rows ({} positive) from {}",
        y.len(),
        y.iter().filter(|&&v| v == 1).count(),
        config.data_path.display()
    );

    let split = train_test_split_stratified(&y.to_vec(), config.test_size, config.random_state)?;
    let x_train = x.select(Axis(0), &split.train);
    let y_train = y.select(Axis(0), &split.train);
    let x_test = x.select(Axis(0), &split.test);
    let y_test = y.select(Axis(0), &split.test);

    let grid = build_param_grid(config);
    let search = grid_search_cv(&x_train, &y_train, &grid, config.cv_folds)?;
    let best_params = search.best_params();
    log::info!(
        "Selected C={} with mean CV ROC-AUC {:.4}",
        best_params.c,
        search.best_score()
    );

    let model = HeartRiskPipeline::fit(&x_train, &y_train, best_params)?;

    let y_test_vec = y_test.to_vec();
    let test_proba = model.predict_proba(x_test.view());
    let test_roc_auc = roc_auc_score(&y_test_vec, &test_proba.to_vec())?;
    let test_pred = model.predict(x_test.view());
    let test_report = ClassificationReport::new(&y_test_vec, &test_pred.to_vec());

    let param_map = best_params.to_param_map();
    println!(
        "Best Parameters: {}",
        serde_json::to_string(&param_map).unwrap_or_default()
    );
    println!("ROC-AUC: {}", test_roc_auc);
    println!("CV ROC-AUC (best mean): {:.4}", search.best_score());
    println!("{}", test_report);

    let model_path = ArtifactStore::from_config(config).save_model(&model)?;

    let metadata = TrainingMetadata {
        trained_at: chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string(),
        roc_auc: search.best_score(),
        best_params: param_map,
    };
    ArtifactStore::from_config(config).save_metadata(&metadata)?;

    Ok(TrainingOutcome {
        model,
        n_train: split.train.len(),
        n_test: split.test.len(),
        n_test_positive: y_test_vec.iter().filter(|&&v| v == 1).count(),
        grid: search,
        test_roc_auc,
        test_report,
        metadata,
        model_path,
    })
}
