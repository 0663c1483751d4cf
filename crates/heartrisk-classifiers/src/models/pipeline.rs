use ndarray::{aview1, Array1, ArrayBase, ArrayView2, Axis, Data, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};
use crate::features::ensure_finite;
use crate::models::classifier_trait::ProbabilisticClassifier;
use crate::models::logistic::{LogisticParams, LogisticRegressionModel};
use crate::preprocessing::StandardScaler;

/// Ordered transform pipeline: standard scaler followed by logistic
/// regression. Both steps are fit together on the same training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRiskPipeline {
    pub scaler: StandardScaler,
    pub classifier: LogisticRegressionModel,
    pub params: LogisticParams,
}

impl HeartRiskPipeline {
    /// Fit the scaler on `x`, then the classifier on the scaled rows.
    pub fn fit<S>(x: &ArrayBase<S, Ix2>, y: &Array1<usize>, params: LogisticParams) -> Result<Self>
    where
        S: Data<Elem = f64>,
    {
        if x.nrows() == 0 {
            return Err(HeartError::EmptyDataset);
        }
        let (scaler, scaled) = StandardScaler::fit_transform(x);
        let classifier = params.fit(&scaled, y)?;
        Ok(Self {
            scaler,
            classifier,
            params,
        })
    }

    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    /// Positive-class probability for a single feature vector. NaN and
    /// infinite values are rejected.
    pub fn predict_proba_one(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features() {
            return Err(HeartError::FeatureCount {
                expected: self.n_features(),
                got: features.len(),
            });
        }
        ensure_finite(features)?;
        let row = aview1(features).insert_axis(Axis(0));
        Ok(self.predict_proba(row)[0])
    }
}

impl ProbabilisticClassifier for HeartRiskPipeline {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let scaled = self.scaler.transform(&x);
        self.classifier.predict_proba(&scaled)
    }

    fn name(&self) -> &str {
        "standard_scaler+logistic_regression"
    }
}
