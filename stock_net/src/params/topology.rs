use crate::{NetErr, Result};

/// The ordered layer sizes of a feedforward network, `[input, hidden.., output]`.
///
/// Adjacent sizes determine the shape of every weight and bias tensor, so a
/// `Topology` can't be modified once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    sizes: Vec<usize>,
}

impl Topology {
    /// Creates a new `Topology`.
    ///
    /// # Arguments
    /// * `input_size` - The amount of features of each sample.
    /// * `hidden_sizes` - The amount of units of each hidden layer, in order.
    /// * `output_size` - The amount of outputs of the network.
    ///
    /// # Returns
    /// A new `Topology` or `NetErr::InvalidConfiguration` if any size is zero.
    pub fn new(input_size: usize, hidden_sizes: &[usize], output_size: usize) -> Result<Self> {
        let mut sizes = Vec::with_capacity(hidden_sizes.len() + 2);
        sizes.push(input_size);
        sizes.extend_from_slice(hidden_sizes);
        sizes.push(output_size);
        Self::from_sizes(sizes)
    }

    /// Creates a new `Topology` from the full list of layer sizes.
    ///
    /// # Arguments
    /// * `sizes` - The layer sizes, input first and output last.
    ///
    /// # Returns
    /// A new `Topology` or `NetErr::InvalidConfiguration` if there are less than
    /// two sizes or any of them is zero.
    pub fn from_sizes(sizes: Vec<usize>) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(NetErr::config(
                "a topology needs at least an input and an output size",
            ));
        }

        if let Some(pos) = sizes.iter().position(|&size| size == 0) {
            return Err(NetErr::config(format!(
                "layer size at position {pos} must be greater than 0"
            )));
        }

        Ok(Self { sizes })
    }

    /// Returns every layer size, input first and output last.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Returns the amount of layer transitions, that is, of weight tensors.
    pub fn layers(&self) -> usize {
        self.sizes.len() - 1
    }

    pub fn input_size(&self) -> usize {
        self.sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    /// Returns the `(fan_in, fan_out)` dimension of the `layer`-th weight tensor.
    pub fn dims(&self, layer: usize) -> Option<(usize, usize)> {
        let fan_in = *self.sizes.get(layer)?;
        let fan_out = *self.sizes.get(layer + 1)?;
        Some((fan_in, fan_out))
    }

    /// Returns the amount of scalar parameters, weights and biases, of the network.
    pub fn num_params(&self) -> usize {
        self.sizes.windows(2).map(|w| (w[0] + 1) * w[1]).sum()
    }
}
