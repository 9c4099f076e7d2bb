use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::Result;

/// A weight generator that samples whole weight tensors from a probabilistic distribution.
pub struct RandWeightGen<D: Distribution<f64>> {
    dim: (usize, usize),
    distribution: D,
}

impl<D: Distribution<f64>> RandWeightGen<D> {
    /// Creates a new `RandWeightGen` weight generator.
    ///
    /// # Arguments
    /// * `dim` - The `(fan_in, fan_out)` shape of the generated tensors.
    /// * `distribution` - The distribution to sample the random numbers from.
    pub fn new(dim: (usize, usize), distribution: D) -> Self {
        Self { dim, distribution }
    }

    /// Samples a new weight tensor.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// A `fan_in x fan_out` tensor.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array2<f64> {
        Array2::random_using(self.dim, &self.distribution, rng)
    }
}

impl RandWeightGen<Normal<f64>> {
    /// Creates a new `RandWeightGen` weight generator with a normal distribution.
    ///
    /// # Arguments
    /// * `dim` - The `(fan_in, fan_out)` shape of the generated tensors.
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(dim: (usize, usize), mean: f64, std_dev: f64) -> Result<Self> {
        Ok(Self::new(dim, Normal::new(mean, std_dev)?))
    }

    /// Creates a new `RandWeightGen` weight generator using Kaiming normal initialization.
    ///
    /// # Arguments
    /// * `dim` - The `(fan_in, fan_out)` shape of the generated tensors.
    /// * `fan_in` - The number of input units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated standard deviation is not finite (Nan or infinite).
    pub fn kaiming(dim: (usize, usize), fan_in: usize) -> Result<Self> {
        let std_dev = (2. / fan_in as f64).sqrt();
        Self::normal(dim, 0., std_dev)
    }

    /// Creates a new `RandWeightGen` weight generator using Xavier normal initialization,
    /// the standard deviation is `sqrt(2 / (fan_in + fan_out))`.
    ///
    /// # Arguments
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated standard deviation is not finite (Nan or infinite).
    pub fn xavier(fan_in: usize, fan_out: usize) -> Result<Self> {
        Self::kaiming((fan_in, fan_out), fan_in + fan_out)
    }
}
