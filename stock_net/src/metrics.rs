use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::{NetErr, Result};

const EPSILON: f64 = 1e-10;

/// Regression metrics of a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
}

impl RegressionMetrics {
    /// Computes the metrics of `y_pred` against `y_true`.
    ///
    /// # Arguments
    /// * `y_true` - The expected values.
    /// * `y_pred` - The predictions.
    ///
    /// # Returns
    /// The metrics, `NetErr::ShapeMismatch` if both disagree in shape or
    /// `NetErr::InvalidBatch` if they are empty.
    pub fn compute(y_true: ArrayView2<f64>, y_pred: ArrayView2<f64>) -> Result<Self> {
        if y_pred.nrows() != y_true.nrows() {
            return Err(NetErr::shape("prediction rows", y_pred.nrows(), y_true.nrows()));
        }

        if y_pred.ncols() != y_true.ncols() {
            return Err(NetErr::shape("prediction columns", y_pred.ncols(), y_true.ncols()));
        }

        let Some(mean) = y_true.mean() else {
            return Err(NetErr::InvalidBatch);
        };

        let n = y_true.len() as f64;
        let err = &y_true - &y_pred;

        let ss_res = err.mapv(|e| e * e).sum();
        let ss_tot = y_true.mapv(|y| (y - mean).powi(2)).sum();
        let mse = ss_res / n;
        let mae = err.mapv(f64::abs).sum() / n;

        let mape = err
            .iter()
            .zip(y_true.iter())
            .map(|(e, y)| (e / (y + EPSILON)).abs())
            .sum::<f64>()
            / n
            * 100.;

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2: 1. - ss_res / (ss_tot + EPSILON),
            mape,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn known_values() {
        let y_true = array![[1.], [2.], [3.], [4.]];
        let y_pred = array![[1.], [2.], [3.], [2.]];

        let m = RegressionMetrics::compute(y_true.view(), y_pred.view()).unwrap();

        assert!((m.mse - 1.).abs() < 1e-12);
        assert!((m.rmse - 1.).abs() < 1e-12);
        assert!((m.mae - 0.5).abs() < 1e-12);
        // ss_tot = 5, ss_res = 4
        assert!((m.r2 - 0.2).abs() < 1e-9);
        // |2 / 4| / 4 * 100
        assert!((m.mape - 12.5).abs() < 1e-6);
    }

    #[test]
    fn perfect_predictions() {
        let y = array![[0.5], [1.5]];
        let m = RegressionMetrics::compute(y.view(), y.view()).unwrap();

        assert_eq!(m.mse, 0.);
        assert!((m.r2 - 1.).abs() < 1e-9);
    }

    #[test]
    fn rejects_mismatched_and_empty_inputs() {
        let y_true = array![[1.], [2.]];
        let y_pred = array![[1.]];
        assert_eq!(
            RegressionMetrics::compute(y_true.view(), y_pred.view()),
            Err(NetErr::shape("prediction rows", 1, 2))
        );

        let empty = Array2::<f64>::zeros((0, 1));
        assert_eq!(
            RegressionMetrics::compute(empty.view(), empty.view()),
            Err(NetErr::InvalidBatch)
        );
    }
}
