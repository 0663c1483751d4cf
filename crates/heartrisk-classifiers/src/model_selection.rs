//! Data splitting and hyper-parameter search.
//!
//! This module contains the stratified train/test split, stratified k-fold
//! cross-validation and an exhaustive grid search that scores every
//! candidate by mean cross-validated ROC-AUC.
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};
use crate::metrics::roc_auc_score;
use crate::models::{HeartRiskPipeline, LogisticParams, ProbabilisticClassifier};

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn indices_by_class(y: &[usize]) -> [Vec<usize>; 2] {
    let mut by_class = [Vec::new(), Vec::new()];
    for (i, &label) in y.iter().enumerate() {
        by_class[label.min(1)].push(i);
    }
    by_class
}

/// Split per-class counts of a total `n_take` proportionally to class sizes.
///
/// Each class first gets the floor of its exact share; leftover rows go to
/// the classes with the largest fractional remainder (lower label first on
/// ties). Shares that divide evenly are therefore reproduced exactly.
fn allocate(class_counts: [usize; 2], n_take: usize) -> [usize; 2] {
    let total: usize = class_counts.iter().sum();
    let exact = class_counts.map(|c| n_take as f64 * c as f64 / total as f64);
    let mut alloc = exact.map(|e| e.floor() as usize);
    let mut leftover = n_take - alloc.iter().sum::<usize>();

    let mut order = [0usize, 1];
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa)
    });
    for &class in order.iter().cycle() {
        if leftover == 0 {
            break;
        }
        if alloc[class] < class_counts[class] {
            alloc[class] += 1;
            leftover -= 1;
        }
    }
    alloc
}

/// Stratified random train/test split.
///
/// The test partition holds `ceil(test_size * n)` rows and preserves the
/// class ratio of `y`. The same `seed` always yields the same split.
pub fn train_test_split_stratified(y: &[usize], test_size: f64, seed: u64) -> Result<Split> {
    let n = y.len();
    if n == 0 {
        return Err(HeartError::EmptyDataset);
    }
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(HeartError::InvalidConfig(format!(
            "test_size={} leaves an empty partition for {} rows",
            test_size, n
        )));
    }

    let by_class = indices_by_class(y);
    if by_class.iter().any(|idx| idx.len() < 2) {
        return Err(HeartError::SingleClass);
    }
    let n_test_per_class = allocate([by_class[0].len(), by_class[1].len()], n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (class, indices) in by_class.iter().enumerate() {
        let mut shuffled = indices.clone();
        shuffled.shuffle(&mut rng);
        let (class_test, class_train) = shuffled.split_at(n_test_per_class[class]);
        test.extend_from_slice(class_test);
        train.extend_from_slice(class_train);
    }
    train.sort_unstable();
    test.sort_unstable();

    log::debug!(
        "Stratified split: {} train rows, {} test rows ({} / {} positives)",
        train.len(),
        test.len(),
        train.iter().filter(|&&i| y[i] == 1).count(),
        test.iter().filter(|&&i| y[i] == 1).count()
    );

    Ok(Split { train, test })
}

/// Deterministic stratified k-fold splits (no shuffling).
///
/// Each class's rows, in their original order, are cut into `n_folds`
/// contiguous chunks whose sizes differ by at most one; fold `k` tests on
/// the k-th chunk of every class.
pub fn stratified_k_fold(y: &[usize], n_folds: usize) -> Result<Vec<Split>> {
    if n_folds < 2 {
        return Err(HeartError::InvalidConfig(format!(
            "n_folds must be at least 2, got {}",
            n_folds
        )));
    }
    let by_class = indices_by_class(y);
    for (class, indices) in by_class.iter().enumerate() {
        if indices.len() < n_folds {
            return Err(HeartError::InvalidConfig(format!(
                "n_folds={} is greater than the number of members in class {} ({})",
                n_folds,
                class,
                indices.len()
            )));
        }
    }

    let mut fold_of = vec![0usize; y.len()];
    for indices in by_class.iter() {
        let m = indices.len();
        let mut start = 0;
        for fold in 0..n_folds {
            let size = m / n_folds + usize::from(fold < m % n_folds);
            for &idx in &indices[start..start + size] {
                fold_of[idx] = fold;
            }
            start += size;
        }
    }

    Ok((0..n_folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| fold_of[i] == fold);
            Split { train, test }
        })
        .collect())
}

/// Cross-validation outcome for one grid candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: LogisticParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// Scores of every candidate, in grid order, plus the selected one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub candidates: Vec<CandidateScore>,
    pub best_index: usize,
}

impl GridSearchResult {
    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }

    pub fn best_params(&self) -> LogisticParams {
        self.best().params
    }

    pub fn best_score(&self) -> f64 {
        self.best().mean_score
    }
}

fn score_candidate(
    x: &Array2<f64>,
    y: &Array1<usize>,
    folds: &[Split],
    params: LogisticParams,
) -> Result<CandidateScore> {
    let mut fold_scores = Vec::with_capacity(folds.len());
    for (fold, split) in folds.iter().enumerate() {
        let x_train = x.select(Axis(0), &split.train);
        let y_train = y.select(Axis(0), &split.train);
        let x_test = x.select(Axis(0), &split.test);
        let y_test = y.select(Axis(0), &split.test);

        let model = HeartRiskPipeline::fit(&x_train, &y_train, params)?;
        let proba = model.predict_proba(x_test.view());
        let auc = roc_auc_score(&y_test.to_vec(), &proba.to_vec())?;
        log::trace!("C={} fold {}: ROC-AUC {:.4}", params.c, fold, auc);
        fold_scores.push(auc);
    }

    let n = fold_scores.len() as f64;
    let mean_score = fold_scores.iter().sum::<f64>() / n;
    let std_score =
        (fold_scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n).sqrt();

    log::info!(
        "C={} mean CV ROC-AUC {:.4} (+/- {:.4})",
        params.c,
        mean_score,
        std_score
    );

    Ok(CandidateScore {
        params,
        fold_scores,
        mean_score,
        std_score,
    })
}

/// Index of the highest mean score; only a strictly better score displaces
/// an earlier candidate.
fn select_best(candidates: &[CandidateScore]) -> usize {
    let mut best_index = 0;
    for (i, cand) in candidates.iter().enumerate().skip(1) {
        if cand.mean_score > candidates[best_index].mean_score {
            best_index = i;
        }
    }
    best_index
}

/// Exhaustive grid search scored by stratified k-fold ROC-AUC.
///
/// Candidates are evaluated in parallel; each fold refits the full scaler +
/// classifier pipeline on that fold's training rows only. The candidate with
/// the highest mean score wins, ties going to the earliest grid entry.
pub fn grid_search_cv(
    x: &Array2<f64>,
    y: &Array1<usize>,
    grid: &[LogisticParams],
    n_folds: usize,
) -> Result<GridSearchResult> {
    if grid.is_empty() {
        return Err(HeartError::InvalidConfig(
            "hyper-parameter grid is empty".to_string(),
        ));
    }
    let folds = stratified_k_fold(&y.to_vec(), n_folds)?;
    log::info!(
        "Grid search over {} candidates x {} folds",
        grid.len(),
        folds.len()
    );

    let candidates = grid
        .par_iter()
        .map(|&params| score_candidate(x, y, &folds, params))
        .collect::<Result<Vec<_>>>()?;

    let best_index = select_best(&candidates);
    Ok(GridSearchResult {
        candidates,
        best_index,
    })
}
