use ndarray::{Array2, ArrayView2};

/// A loss function over a batch of predictions.
pub trait LossFn {
    /// The scalar loss reported for the batch.
    fn loss(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> f64;

    /// The output error `δ` the backward pass starts from.
    ///
    /// It is not divided by the batch size, the backward pass does that when
    /// averaging the per sample gradients.
    fn delta(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64>;
}

/// Mean squared error loss function.
///
/// The reported loss is `mean((ŷ - y)²)` while `delta` is `ŷ - y`, so the
/// gradients follow `J = 1/(2m) Σ(ŷ - y)²`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl Mse {
    /// Returns a new `Mse`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> f64 {
        (&y_pred - &y)
            .mapv(|x| x.powi(2))
            .mean()
            .unwrap_or_default()
    }

    fn delta(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64> {
        &y_pred - &y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mse_on_known_values() {
        let y_pred = array![[1.], [2.], [4.]];
        let y = array![[1.], [1.], [1.]];

        let loss = Mse::new().loss(y_pred.view(), y.view());
        assert!((loss - 10. / 3.).abs() < 1e-12);
        assert_eq!(Mse.delta(y_pred.view(), y.view()), array![[0.], [1.], [3.]]);
    }

    #[test]
    fn empty_batch_has_no_loss() {
        let empty = Array2::<f64>::zeros((0, 1));
        assert_eq!(Mse.loss(empty.view(), empty.view()), 0.);
    }
}
