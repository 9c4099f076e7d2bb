use ndarray::{Array2, ArrayView2, Axis, linalg};

use super::{ForwardContext, LossFn, Mse};
use crate::{NetErr, Result, params::ParamStore};

/// The gradient of the loss with respect to every parameter tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    weights: Vec<Array2<f64>>,
    biases: Vec<Array2<f64>>,
}

impl Gradients {
    pub fn layers(&self) -> usize {
        self.weights.len()
    }

    pub fn weight(&self, i: usize) -> Option<ArrayView2<'_, f64>> {
        self.weights.get(i).map(|dw| dw.view())
    }

    pub fn bias(&self, i: usize) -> Option<ArrayView2<'_, f64>> {
        self.biases.get(i).map(|db| db.view())
    }

    /// Whether every component of the gradient is a finite number.
    pub fn is_finite(&self) -> bool {
        self.tensors().all(|t| t.iter().all(|x| x.is_finite()))
    }

    /// Iterates every tensor in optimizer slot order: `dw0, db0, dw1, db1, ..`.
    pub(crate) fn tensors(&self) -> impl Iterator<Item = &Array2<f64>> {
        self.weights
            .iter()
            .zip(&self.biases)
            .flat_map(|(dw, db)| [dw, db])
    }
}

/// Computes the gradients of a batch from its forward context.
#[derive(Debug, Clone)]
pub struct BackPropagator<L = Mse> {
    l2_reg: f64,
    loss_fn: L,
}

impl BackPropagator {
    /// Creates a new `BackPropagator` for the mean squared error.
    ///
    /// # Arguments
    /// * `l2_reg` - The L2 coefficient applied to the weights (never the biases).
    ///
    /// # Returns
    /// A new `BackPropagator` or `NetErr::InvalidConfiguration` if `l2_reg` is negative
    /// or not finite.
    pub fn new(l2_reg: f64) -> Result<Self> {
        Self::with_loss(l2_reg, Mse::new())
    }
}

impl<L: LossFn> BackPropagator<L> {
    /// Creates a new `BackPropagator` for an arbitrary loss function.
    pub fn with_loss(l2_reg: f64, loss_fn: L) -> Result<Self> {
        if !l2_reg.is_finite() || l2_reg < 0. {
            return Err(NetErr::config(format!(
                "l2 coefficient must be a non negative number, got {l2_reg}"
            )));
        }

        Ok(Self { l2_reg, loss_fn })
    }

    pub fn l2_reg(&self) -> f64 {
        self.l2_reg
    }

    pub fn loss_fn(&self) -> &L {
        &self.loss_fn
    }

    /// Makes a backward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The parameters the forward pass was made with.
    /// * `ctx` - The context of the matching forward pass.
    /// * `y_pred` - The prediction of the matching forward pass.
    /// * `y` - The targets of the batch.
    ///
    /// # Returns
    /// The gradient of every tensor, `NetErr::InvalidBatch` if the batch is empty or
    /// `NetErr::ShapeMismatch` if the targets, the prediction and the context disagree.
    pub fn backward(
        &self,
        params: &ParamStore,
        ctx: &ForwardContext,
        y_pred: ArrayView2<f64>,
        y: ArrayView2<f64>,
    ) -> Result<Gradients> {
        let m = ctx.batch_size();
        if m == 0 {
            return Err(NetErr::InvalidBatch);
        }

        if ctx.layers() != params.layers() {
            return Err(NetErr::shape("context layers", ctx.layers(), params.layers()));
        }

        if y_pred.nrows() != m {
            return Err(NetErr::shape("prediction rows", y_pred.nrows(), m));
        }

        if y.nrows() != m {
            return Err(NetErr::shape("target rows", y.nrows(), m));
        }

        if y.ncols() != y_pred.ncols() {
            return Err(NetErr::shape("target columns", y.ncols(), y_pred.ncols()));
        }

        let nlayers = params.layers();
        let scale = 1. / m as f64;

        let mut weights = Vec::with_capacity(nlayers);
        let mut biases = Vec::with_capacity(nlayers);
        let mut d = self.loss_fn.delta(y_pred, y);

        for i in (0..nlayers).rev() {
            let w = params.weight(i);
            let x = ctx.input(i);

            let mut dw = w.mapv(|w| self.l2_reg * w);
            linalg::general_mat_mul(scale, &x.t(), &d, 1.0, &mut dw);
            let db = d.sum_axis(Axis(0)).insert_axis(Axis(0)) * scale;

            weights.push(dw);
            biases.push(db);

            if i == 0 {
                break;
            }

            let mut d_prev = Array2::zeros((m, w.nrows()));
            linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut d_prev);
            d_prev.zip_mut_with(ctx.pre_activation(i - 1), |d, &z| {
                if z <= 0. {
                    *d = 0.;
                }
            });

            if let Some(mask) = ctx.mask(i - 1) {
                d_prev *= mask;
            }

            d = d_prev;
        }

        weights.reverse();
        biases.reverse();

        Ok(Gradients { weights, biases })
    }
}
