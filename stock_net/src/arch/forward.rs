use ndarray::{Array2, ArrayView2, linalg};
use rand::Rng;

use super::Dropout;
use crate::{NetErr, Result, params::ParamStore};

/// Everything a forward pass cached for its matching backward pass.
///
/// `inputs[i]` is the input of layer `i` (the batch itself for the first layer),
/// `pre_activations[i]` is the linear output `z` of hidden layer `i` and `masks[i]`
/// the dropout mask applied to its activation, if any.
#[derive(Debug, Clone)]
pub struct ForwardContext {
    inputs: Vec<Array2<f64>>,
    pre_activations: Vec<Array2<f64>>,
    masks: Vec<Option<Array2<f64>>>,
}

impl ForwardContext {
    /// Returns the amount of samples of the batch this context was built from.
    pub fn batch_size(&self) -> usize {
        self.inputs.first().map_or(0, |x| x.nrows())
    }

    /// Returns the amount of layers this context holds the inputs of.
    pub fn layers(&self) -> usize {
        self.inputs.len()
    }

    pub(crate) fn input(&self, layer: usize) -> &Array2<f64> {
        &self.inputs[layer]
    }

    pub(crate) fn pre_activation(&self, hidden: usize) -> &Array2<f64> {
        &self.pre_activations[hidden]
    }

    pub(crate) fn mask(&self, hidden: usize) -> Option<&Array2<f64>> {
        self.masks[hidden].as_ref()
    }
}

/// Computes the layer activations of a network.
#[derive(Debug, Clone)]
pub struct ForwardPropagator {
    dropout: Dropout,
}

impl ForwardPropagator {
    /// Creates a new `ForwardPropagator`.
    ///
    /// # Arguments
    /// * `dropout_rate` - The dropout rate of the hidden layers, in `[0, 1)`.
    ///
    /// # Returns
    /// A new `ForwardPropagator` or `NetErr::InvalidConfiguration` if the rate is out of range.
    pub fn new(dropout_rate: f64) -> Result<Self> {
        Ok(Self {
            dropout: Dropout::new(dropout_rate)?,
        })
    }

    pub fn dropout_rate(&self) -> f64 {
        self.dropout.rate()
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The parameters of the network.
    /// * `x` - The input batch, one sample per row.
    /// * `training` - Whether dropout masks should be sampled.
    /// * `rng` - The generator the dropout masks are sampled with.
    ///
    /// # Returns
    /// The prediction with its forward context, or `NetErr::ShapeMismatch` if the
    /// width of `x` isn't the input size of the network.
    pub fn forward<R: Rng + ?Sized>(
        &self,
        params: &ParamStore,
        x: ArrayView2<f64>,
        training: bool,
        rng: &mut R,
    ) -> Result<(Array2<f64>, ForwardContext)> {
        if training {
            self.run(params, x, |shape| self.dropout.mask(shape, rng))
        } else {
            self.run(params, x, |_| None)
        }
    }

    /// Makes an inference forward pass, no dropout is applied.
    ///
    /// # Returns
    /// The prediction or `NetErr::ShapeMismatch` if the width of `x` isn't the input size.
    pub fn predict(&self, params: &ParamStore, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let (y_pred, _) = self.run(params, x, |_| None)?;
        Ok(y_pred)
    }

    fn run<F>(
        &self,
        params: &ParamStore,
        x: ArrayView2<f64>,
        mut mask_for: F,
    ) -> Result<(Array2<f64>, ForwardContext)>
    where
        F: FnMut((usize, usize)) -> Option<Array2<f64>>,
    {
        let expected = params.topology().input_size();
        if x.ncols() != expected {
            return Err(NetErr::shape("input width", x.ncols(), expected));
        }

        let last = params.layers() - 1;
        let mut ctx = ForwardContext {
            inputs: Vec::with_capacity(last + 1),
            pre_activations: Vec::with_capacity(last),
            masks: Vec::with_capacity(last),
        };

        let mut a = x.to_owned();

        for i in 0..last {
            let z = linear(&a, params.weight(i), params.bias(i));

            let mut next = z.mapv(|v| v.max(0.));
            let mask = mask_for(next.dim());
            if let Some(mask) = &mask {
                next *= mask;
            }

            ctx.inputs.push(a);
            ctx.pre_activations.push(z);
            ctx.masks.push(mask);
            a = next;
        }

        let y_pred = linear(&a, params.weight(last), params.bias(last));
        ctx.inputs.push(a);

        Ok((y_pred, ctx))
    }
}

/// Computes `a · w + b`, broadcasting the bias row over the batch.
fn linear(a: &Array2<f64>, w: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let mut z = Array2::zeros((a.nrows(), w.ncols()));
    linalg::general_mat_mul(1.0, a, w, 0.0, &mut z);
    z += b;
    z
}
