use crate::{Result, arch::Gradients, params::ParamStore};

/// Defines the strategy for updating model parameters based on calculated gradients.
pub trait Optimizer {
    /// Updates every tensor of the store using the gradients of one mini-batch.
    ///
    /// # Arguments
    /// * `params` - The parameters to update in place.
    /// * `grads` - The gradients of the batch, one per tensor of `params`.
    ///
    /// # Returns
    /// An error if `grads` doesn't follow the shapes of `params`.
    fn update_params(&mut self, params: &mut ParamStore, grads: &Gradients) -> Result<()>;
}
