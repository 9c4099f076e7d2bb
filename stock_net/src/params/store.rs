use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{RandWeightGen, Topology};
use crate::{NetErr, Result};

/// Owns the weight and bias tensors of a feedforward network.
///
/// Every layer transition `i` has a `fan_in x fan_out` weight tensor and a
/// `1 x fan_out` bias tensor. Cloning a store deep copies every buffer, so a
/// clone can be kept as a checkpoint or snapshot while the original keeps
/// being optimized in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamStore {
    topology: Topology,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array2<f64>>,
}

impl ParamStore {
    /// Creates a randomly initialized `ParamStore`.
    ///
    /// Weights are sampled with Xavier normal initialization and biases start at zero.
    ///
    /// # Arguments
    /// * `input_size` - The amount of features of each sample.
    /// * `hidden_sizes` - The amount of units of each hidden layer.
    /// * `output_size` - The amount of outputs of the network.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// A new `ParamStore` or `NetErr::InvalidConfiguration` if any size is zero.
    pub fn initialize<R: Rng + ?Sized>(
        input_size: usize,
        hidden_sizes: &[usize],
        output_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let topology = Topology::new(input_size, hidden_sizes, output_size)?;
        Self::with_topology(topology, rng)
    }

    /// Creates a randomly initialized `ParamStore` for an existing topology.
    pub fn with_topology<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Result<Self> {
        let mut weights = Vec::with_capacity(topology.layers());
        let mut biases = Vec::with_capacity(topology.layers());

        for window in topology.sizes().windows(2) {
            let (fan_in, fan_out) = (window[0], window[1]);
            weights.push(RandWeightGen::xavier(fan_in, fan_out)?.sample(rng));
            biases.push(Array2::zeros((1, fan_out)));
        }

        Ok(Self {
            topology,
            weights,
            biases,
        })
    }

    /// Rebuilds a `ParamStore` from explicit tensors.
    ///
    /// # Arguments
    /// * `topology` - The topology the tensors must follow.
    /// * `weights` - One weight tensor per layer.
    /// * `biases` - One bias tensor per layer.
    ///
    /// # Returns
    /// A new `ParamStore` or `NetErr::ShapeMismatch` if the tensors don't follow the topology.
    pub fn from_parts(
        topology: Topology,
        weights: Vec<Array2<f64>>,
        biases: Vec<Array2<f64>>,
    ) -> Result<Self> {
        let layers = topology.layers();

        if weights.len() != layers {
            return Err(NetErr::shape("weight tensors", weights.len(), layers));
        }

        if biases.len() != layers {
            return Err(NetErr::shape("bias tensors", biases.len(), layers));
        }

        let store = Self {
            topology,
            weights,
            biases,
        };

        for i in 0..layers {
            store.check_weight(i, store.weights[i].view())?;
            store.check_bias(i, store.biases[i].view())?;
        }

        Ok(store)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Returns the amount of layer transitions.
    pub fn layers(&self) -> usize {
        self.weights.len()
    }

    pub fn num_params(&self) -> usize {
        self.topology.num_params()
    }

    /// Returns a view of the `i`-th weight tensor or `NetErr::ShapeMismatch` if out of range.
    pub fn get_weight(&self, i: usize) -> Result<ArrayView2<'_, f64>> {
        self.weights
            .get(i)
            .map(|w| w.view())
            .ok_or_else(|| NetErr::shape("layer index", i, self.layers()))
    }

    /// Returns a view of the `i`-th bias tensor or `NetErr::ShapeMismatch` if out of range.
    pub fn get_bias(&self, i: usize) -> Result<ArrayView2<'_, f64>> {
        self.biases
            .get(i)
            .map(|b| b.view())
            .ok_or_else(|| NetErr::shape("layer index", i, self.layers()))
    }

    /// Replaces the `i`-th weight tensor.
    ///
    /// # Returns
    /// `NetErr::ShapeMismatch` if `i` is out of range or `value` doesn't have the layer's shape.
    pub fn set_weight(&mut self, i: usize, value: Array2<f64>) -> Result<()> {
        self.check_weight(i, value.view())?;
        self.weights[i] = value;
        Ok(())
    }

    /// Replaces the `i`-th bias tensor.
    ///
    /// # Returns
    /// `NetErr::ShapeMismatch` if `i` is out of range or `value` isn't `1 x fan_out`.
    pub fn set_bias(&mut self, i: usize, value: Array2<f64>) -> Result<()> {
        self.check_bias(i, value.view())?;
        self.biases[i] = value;
        Ok(())
    }

    /// Overwrites every tensor with the ones in `snapshot`, reusing the current buffers.
    ///
    /// # Returns
    /// `NetErr::ShapeMismatch` if both stores don't share the same topology, in which case
    /// nothing is modified.
    pub fn restore(&mut self, snapshot: &ParamStore) -> Result<()> {
        let ours = self.topology.sizes();
        let theirs = snapshot.topology.sizes();

        if ours.len() != theirs.len() {
            return Err(NetErr::shape("topology layers", theirs.len(), ours.len()));
        }

        if let Some((got, expected)) = theirs.iter().zip(ours).find(|(a, b)| a != b) {
            return Err(NetErr::shape("topology layer size", *got, *expected));
        }

        self.weights.clone_from(&snapshot.weights);
        self.biases.clone_from(&snapshot.biases);
        Ok(())
    }

    /// Whether every parameter is a finite number.
    pub fn is_finite(&self) -> bool {
        self.weights
            .iter()
            .chain(&self.biases)
            .all(|t| t.iter().all(|x| x.is_finite()))
    }

    pub(crate) fn weight(&self, i: usize) -> &Array2<f64> {
        &self.weights[i]
    }

    pub(crate) fn bias(&self, i: usize) -> &Array2<f64> {
        &self.biases[i]
    }

    pub(crate) fn into_parts(self) -> (Topology, Vec<Array2<f64>>, Vec<Array2<f64>>) {
        (self.topology, self.weights, self.biases)
    }

    /// Iterates every tensor mutably in optimizer slot order: `w0, b0, w1, b1, ..`.
    pub(crate) fn tensors_mut(&mut self) -> impl Iterator<Item = &mut Array2<f64>> {
        self.weights
            .iter_mut()
            .zip(self.biases.iter_mut())
            .flat_map(|(w, b)| [w, b])
    }

    /// Iterates every tensor in optimizer slot order: `w0, b0, w1, b1, ..`.
    pub(crate) fn tensors(&self) -> impl Iterator<Item = &Array2<f64>> {
        self.weights
            .iter()
            .zip(&self.biases)
            .flat_map(|(w, b)| [w, b])
    }

    fn check_weight(&self, i: usize, value: ArrayView2<f64>) -> Result<()> {
        let (fan_in, fan_out) = self
            .topology
            .dims(i)
            .ok_or_else(|| NetErr::shape("layer index", i, self.layers()))?;

        if value.nrows() != fan_in {
            return Err(NetErr::shape("weight rows", value.nrows(), fan_in));
        }

        if value.ncols() != fan_out {
            return Err(NetErr::shape("weight columns", value.ncols(), fan_out));
        }

        Ok(())
    }

    fn check_bias(&self, i: usize, value: ArrayView2<f64>) -> Result<()> {
        let (_, fan_out) = self
            .topology
            .dims(i)
            .ok_or_else(|| NetErr::shape("layer index", i, self.layers()))?;

        if value.nrows() != 1 {
            return Err(NetErr::shape("bias rows", value.nrows(), 1));
        }

        if value.ncols() != fan_out {
            return Err(NetErr::shape("bias columns", value.ncols(), fan_out));
        }

        Ok(())
    }
}
