use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Bernoulli;

use crate::{NetErr, Result};

/// Inverted dropout.
///
/// Kept units are scaled by `1 / (1 - rate)` at training time so inference
/// needs no rescaling.
#[derive(Debug, Clone)]
pub struct Dropout {
    rate: f64,
    keep: Option<Bernoulli>,
}

impl Dropout {
    /// Creates a new `Dropout`.
    ///
    /// # Arguments
    /// * `rate` - The probability of dropping each unit, in `[0, 1)`.
    ///
    /// # Returns
    /// A new `Dropout` or `NetErr::InvalidConfiguration` if `rate` is out of range.
    pub fn new(rate: f64) -> Result<Self> {
        if !(0. ..1.).contains(&rate) {
            return Err(NetErr::config(format!(
                "dropout rate must be in [0, 1), got {rate}"
            )));
        }

        let keep = if rate > 0. {
            Some(Bernoulli::new(1. - rate)?)
        } else {
            None
        };

        Ok(Self { rate, keep })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Samples a mask for an activation of the given shape.
    ///
    /// # Returns
    /// `None` when the rate is zero, otherwise a tensor of `0` and `1 / (1 - rate)` values.
    pub fn mask<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Option<Array2<f64>> {
        let keep = self.keep.as_ref()?;
        let scale = 1. / (1. - self.rate);

        let kept: Array2<bool> = Array2::random_using(shape, keep, rng);
        Some(kept.mapv(|k| if k { scale } else { 0. }))
    }
}
