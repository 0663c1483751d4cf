use ndarray::{Array1, ArrayView2};

use crate::predict::label_for_probability;

/// A small trait abstraction for fitted binary classifiers that produce a
/// positive-class probability. The evaluator and the predictor only depend
/// on this contract, not on the concrete pipeline type.
pub trait ProbabilisticClassifier {
    /// Positive-class probability (0..1) for every row of `x`.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64>;

    /// Hard 0/1 labels using the shared decision threshold.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<usize> {
        self.predict_proba(x).mapv(label_for_probability)
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
