//! Feature standardization.
//!
//! Provides a `StandardScaler` that learns per-column mean and standard
//! deviation from training rows and maps features to zero mean and unit
//! variance. The fitted parameters are serialized as part of the model
//! artifact so inference reuses exactly the training statistics.

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
use serde::{Deserialize, Serialize};

/// Standard scaler (per-column mean/std).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Columns whose standard deviation falls below this are left unscaled.
    const MIN_STD: f64 = 1e-12;

    /// Fit a scaler from a matrix where rows are samples and columns are
    /// features. Uses the population standard deviation.
    ///
    /// Panics on an empty matrix; callers validate row counts first.
    pub fn fit<S>(x: &ArrayBase<S, Ix2>) -> Self
    where
        S: Data<Elem = f64>,
    {
        let (nrows, ncols) = x.dim();
        assert!(
            nrows > 0 && ncols > 0,
            "StandardScaler::fit requires a non-empty matrix"
        );

        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(ncols));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < Self::MIN_STD { 1.0 } else { s });

        StandardScaler {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Transform all rows and return a new matrix.
    pub fn transform<S>(&self, x: &ArrayBase<S, Ix2>) -> Array2<f64>
    where
        S: Data<Elem = f64>,
    {
        assert_eq!(
            x.ncols(),
            self.n_features(),
            "StandardScaler::transform: feature count mismatch"
        );
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(self.scale.clone());
        (x - &mean) / &scale
    }

    /// Fit on `x` and return the transformed matrix alongside the scaler.
    pub fn fit_transform<S>(x: &ArrayBase<S, Ix2>) -> (Self, Array2<f64>)
    where
        S: Data<Elem = f64>,
    {
        let sc = Self::fit(x);
        let t = sc.transform(x);
        (sc, t)
    }
}
