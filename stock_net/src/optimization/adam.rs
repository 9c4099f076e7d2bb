use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::Optimizer;
use crate::{NetErr, Result, arch::Gradients, params::ParamStore};

/// When the Adam step counter `t` advances.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCounting {
    /// Once per mini-batch, shared by every tensor updated in that batch.
    #[default]
    PerBatch,
    /// On every single tensor update.
    PerTensor,
}

/// The hyperparameters of the Adam optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub step_counting: StepCounting,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step_counting: StepCounting::default(),
        }
    }
}

impl AdamConfig {
    /// Returns the default configuration with the given learning rate.
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(NetErr::config(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }

        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0. ..1.).contains(&beta) {
                return Err(NetErr::config(format!("{name} must be in [0, 1), got {beta}")));
            }
        }

        if !self.epsilon.is_finite() || self.epsilon <= 0. {
            return Err(NetErr::config(format!(
                "epsilon must be a positive number, got {}",
                self.epsilon
            )));
        }

        Ok(())
    }
}

/// The Adam optimizer.
///
/// Holds a first and second moment buffer per parameter tensor, in slot order
/// `w0, b0, w1, b1, ..`, allocated from the shapes of the store it optimizes.
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    t: u64,
    beta1_t: f64,
    beta2_t: f64,
    m: Vec<Array2<f64>>,
    v: Vec<Array2<f64>>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `params` - The store whose tensor shapes the moment buffers follow.
    /// * `config` - The hyperparameters of the algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance or `NetErr::InvalidConfiguration` if a hyperparameter is
    /// out of its domain.
    pub fn new(params: &ParamStore, config: AdamConfig) -> Result<Self> {
        config.validate()?;

        let m: Vec<_> = params.tensors().map(|t| Array2::zeros(t.dim())).collect();
        let v = m.clone();

        Ok(Self {
            config,
            t: 0,
            beta1_t: 1.,
            beta2_t: 1.,
            m,
            v,
        })
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Returns the current value of the step counter `t`.
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Returns the amount of tensors this optimizer holds moments for.
    pub fn slots(&self) -> usize {
        self.m.len()
    }

    /// Updates a single tensor, advancing the step counter first.
    ///
    /// # Arguments
    /// * `slot` - The slot of the tensor, `2 * layer` for weights and `2 * layer + 1` for biases.
    /// * `param` - The tensor to update in place.
    /// * `grad` - Its gradient.
    ///
    /// # Returns
    /// `NetErr::ShapeMismatch` if the slot doesn't exist or the shapes disagree.
    pub fn update(
        &mut self,
        slot: usize,
        param: &mut Array2<f64>,
        grad: ArrayView2<f64>,
    ) -> Result<()> {
        self.check(slot, param, grad)?;
        self.advance();
        self.apply(slot, param, grad);
        Ok(())
    }

    fn check(&self, slot: usize, param: &Array2<f64>, grad: ArrayView2<f64>) -> Result<()> {
        let m = self
            .m
            .get(slot)
            .ok_or_else(|| NetErr::shape("optimizer slot", slot, self.m.len()))?;

        if param.dim() != m.dim() {
            return Err(NetErr::shape("parameter elements", param.len(), m.len()));
        }

        if grad.dim() != m.dim() {
            return Err(NetErr::shape("gradient elements", grad.len(), m.len()));
        }

        Ok(())
    }

    fn advance(&mut self) {
        self.t += 1;
        self.beta1_t *= self.config.beta1;
        self.beta2_t *= self.config.beta2;
    }

    fn apply(&mut self, slot: usize, param: &mut Array2<f64>, grad: ArrayView2<f64>) {
        let AdamConfig {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = self.config;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;

        Zip::from(param)
            .and(&grad)
            .and(&mut self.m[slot])
            .and(&mut self.v[slot])
            .for_each(|p, &g, m, v| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g * g;
                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut ParamStore, grads: &Gradients) -> Result<()> {
        if grads.layers() * 2 != self.slots() {
            return Err(NetErr::shape("gradient tensors", grads.layers() * 2, self.slots()));
        }

        for (slot, (param, grad)) in params.tensors_mut().zip(grads.tensors()).enumerate() {
            self.check(slot, param, grad.view())?;
        }

        if self.config.step_counting == StepCounting::PerBatch {
            self.advance();
        }

        for (slot, (param, grad)) in params.tensors_mut().zip(grads.tensors()).enumerate() {
            if self.config.step_counting == StepCounting::PerTensor {
                self.advance();
            }

            self.apply(slot, param, grad.view());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn single_tensor() -> (ParamStore, Adam) {
        let topology = crate::params::Topology::new(1, &[], 1).unwrap();
        let params =
            ParamStore::from_parts(topology, vec![array![[0.]]], vec![array![[0.]]]).unwrap();
        let adam = Adam::new(&params, AdamConfig::with_learning_rate(0.1)).unwrap();
        (params, adam)
    }

    #[test]
    fn first_step_moves_by_the_learning_rate() {
        let (_, mut adam) = single_tensor();
        let mut w = array![[1.]];

        adam.update(0, &mut w, array![[3.]].view()).unwrap();

        // m_hat = g and v_hat = g², so the step is lr * g / (|g| + eps).
        assert!((w[(0, 0)] - 0.9).abs() < 1e-6);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn zero_gradients_after_a_step_decay_towards_no_update() {
        let (_, mut adam) = single_tensor();
        let mut w = array![[0.]];
        let zero = array![[0.]];

        adam.update(0, &mut w, array![[1.]].view()).unwrap();

        let mut prev_delta = f64::INFINITY;
        for _ in 0..30 {
            let before = w[(0, 0)];
            adam.update(0, &mut w, zero.view()).unwrap();
            let delta = (w[(0, 0)] - before).abs();

            assert!(delta < prev_delta, "{delta} >= {prev_delta}");
            prev_delta = delta;
        }

        assert!(prev_delta < 0.01);
    }

    #[test]
    fn per_batch_counting_advances_once_per_update() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut params = ParamStore::initialize(2, &[3], 1, &mut rng).unwrap();
        let grads = zero_grads(&params);
        let mut adam = Adam::new(&params, AdamConfig::default()).unwrap();

        adam.update_params(&mut params, &grads).unwrap();
        adam.update_params(&mut params, &grads).unwrap();

        assert_eq!(adam.steps(), 2);
    }

    #[test]
    fn per_tensor_counting_advances_on_every_tensor() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut params = ParamStore::initialize(2, &[3], 1, &mut rng).unwrap();
        let grads = zero_grads(&params);
        let config = AdamConfig {
            step_counting: StepCounting::PerTensor,
            ..Default::default()
        };
        let mut adam = Adam::new(&params, config).unwrap();

        adam.update_params(&mut params, &grads).unwrap();

        assert_eq!(adam.steps(), 4);
    }

    #[test]
    fn update_params_leaves_zero_gradient_params_alone() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut params = ParamStore::initialize(2, &[3], 1, &mut rng).unwrap();
        let before = params.clone();
        let grads = zero_grads(&params);
        let mut adam = Adam::new(&params, AdamConfig::default()).unwrap();

        adam.update_params(&mut params, &grads).unwrap();

        assert_eq!(params, before);
    }

    #[test]
    fn rejects_mismatched_slots() {
        let (_, mut adam) = single_tensor();
        let mut w = array![[0., 0.]];

        assert!(adam.update(0, &mut w, array![[0., 0.]].view()).is_err());
        assert!(adam.update(7, &mut array![[0.]], array![[0.]].view()).is_err());
        assert_eq!(adam.steps(), 0);
    }

    #[test]
    fn rejects_bad_learning_rates() {
        let (params, _) = single_tensor();

        for lr in [0., -0.1, f64::NAN, f64::INFINITY] {
            let res = Adam::new(&params, AdamConfig::with_learning_rate(lr));
            assert!(matches!(res, Err(NetErr::InvalidConfiguration(_))));
        }
    }

    fn zero_grads(params: &ParamStore) -> Gradients {
        let fwd = crate::arch::ForwardPropagator::new(0.).unwrap();
        let bwd = crate::arch::BackPropagator::new(0.).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let x = Array2::<f64>::zeros((1, params.topology().input_size()));

        let (y_pred, ctx) = fwd.forward(params, x.view(), false, &mut rng).unwrap();
        bwd.backward(params, &ctx, y_pred.view(), y_pred.view()).unwrap()
    }
}
