use std::collections::BTreeMap;

use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, ArrayBase, Data, Ix2};
use serde::{Deserialize, Serialize};

use crate::config::{LogisticConfig, Penalty, Solver};
use crate::error::{HeartError, Result};

/// Largest per-row objective gradient accepted as converged.
pub const STATIONARITY_TOLERANCE: f64 = 1e-3;

/// One point of the hyper-parameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength.
    pub c: f64,
    pub penalty: Penalty,
    pub solver: Solver,
    pub max_iter: u64,
}

impl LogisticParams {
    pub fn new(c: f64, config: &LogisticConfig) -> Self {
        Self {
            c,
            penalty: config.penalty,
            solver: config.solver,
            max_iter: config.max_iter,
        }
    }

    /// Expand the configured `C` values into grid candidates, in order.
    pub fn grid(config: &LogisticConfig) -> Vec<LogisticParams> {
        config
            .c_grid
            .iter()
            .map(|&c| LogisticParams::new(c, config))
            .collect()
    }

    /// Searched hyper-parameters keyed by their pipeline step name.
    pub fn to_param_map(&self) -> BTreeMap<String, serde_json::Value> {
        let mut map = BTreeMap::new();
        map.insert("classifier__C".to_string(), serde_json::json!(self.c));
        map.insert(
            "classifier__penalty".to_string(),
            serde_json::json!(self.penalty.as_str()),
        );
        map.insert(
            "classifier__solver".to_string(),
            serde_json::json!(self.solver.as_str()),
        );
        map
    }

    /// Fit a binary logistic regression on `x` (already scaled) and 0/1
    /// labels `y`.
    ///
    /// The L-BFGS objective is `sum(logloss) + 0.5 * alpha * ||w||^2`, so
    /// `alpha = 1 / C` gives the same optimum as `C * sum(logloss) + 0.5 * ||w||^2`.
    ///
    /// Hitting `max_iter` without converging is not an error. linfa-logistic
    /// does not report its iteration count or termination reason, so the
    /// returned weights are checked for stationarity instead and a warning is
    /// logged when the objective gradient is still above
    /// `STATIONARITY_TOLERANCE`.
    pub fn fit<S>(&self, x: &ArrayBase<S, Ix2>, y: &Array1<usize>) -> Result<LogisticRegressionModel>
    where
        S: Data<Elem = f64>,
    {
        if x.nrows() == 0 {
            return Err(HeartError::EmptyDataset);
        }
        let n_pos = y.iter().filter(|&&v| v == 1).count();
        if n_pos == 0 || n_pos == y.len() {
            return Err(HeartError::SingleClass);
        }

        let dataset = Dataset::new(x.to_owned(), y.clone());
        let fitted = LogisticRegression::default()
            .alpha(1.0 / self.c)
            .max_iterations(self.max_iter)
            .with_intercept(true)
            .fit(&dataset)
            .map_err(|e| HeartError::Training(e.to_string()))?;

        // linfa picks its own positive class; orient the weights towards label 1.
        let sign = if fitted.labels().pos.class == 1 { 1.0 } else { -1.0 };
        let coef = fitted.params().mapv(|w| sign * w).to_vec();
        let intercept = sign * fitted.intercept();

        log::trace!(
            "Fitted logistic regression C={} intercept={:.4} coef={:?}",
            self.c,
            intercept,
            coef
        );

        let model = LogisticRegressionModel { coef, intercept };
        let gradient = model.objective_gradient(x, y, 1.0 / self.c);
        if gradient > STATIONARITY_TOLERANCE {
            log::warn!(
                "Logistic regression with C={} did not converge within max_iter={} \
                 (gradient {:.2e}); consider raising max_iter",
                self.c,
                self.max_iter,
                gradient
            );
        }
        Ok(model)
    }
}

/// Fitted logistic-regression decision function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionModel {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegressionModel {
    /// Signed distance `x . w + b` for every row.
    pub fn decision_function<S>(&self, x: &ArrayBase<S, Ix2>) -> Array1<f64>
    where
        S: Data<Elem = f64>,
    {
        let w = Array1::from(self.coef.clone());
        x.dot(&w) + self.intercept
    }

    /// Largest absolute component of the gradient of
    /// `sum(logloss) + 0.5 * alpha * ||w||^2`, divided by the number of rows.
    /// The intercept is not penalized. Zero at the exact optimum.
    pub fn objective_gradient<S>(&self, x: &ArrayBase<S, Ix2>, y: &Array1<usize>, alpha: f64) -> f64
    where
        S: Data<Elem = f64>,
    {
        let n = x.nrows().max(1) as f64;
        let residual = self.predict_proba(x) - y.mapv(|v| v as f64);
        let grad_w = x.t().dot(&residual) + Array1::from(self.coef.clone()) * alpha;
        let grad_b = residual.sum();
        grad_w
            .iter()
            .chain(std::iter::once(&grad_b))
            .fold(0.0_f64, |acc, g| acc.max(g.abs()))
            / n
    }

    /// Positive-class probability for every row.
    pub fn predict_proba<S>(&self, x: &ArrayBase<S, Ix2>) -> Array1<f64>
    where
        S: Data<Elem = f64>,
    {
        self.decision_function(x).mapv(sigmoid)
    }
}

/// Logistic function, evaluated without overflow for large |z|.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
