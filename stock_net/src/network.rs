use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    NetErr, Result,
    arch::{BackPropagator, ForwardPropagator, LossFn, Mse},
    config::ModelConfig,
    optimization::AdamConfig,
    params::{ParamStore, Topology},
};

/// The hyperparameters of a network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub dropout_rate: f64,
    pub l2_reg: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            dropout_rate: 0.2,
            l2_reg: 0.01,
        }
    }
}

impl Hyperparameters {
    /// Checks every hyperparameter is in its domain.
    ///
    /// # Returns
    /// `NetErr::InvalidConfiguration` naming the first one that isn't.
    pub fn validate(&self) -> Result<()> {
        ForwardPropagator::new(self.dropout_rate)?;
        BackPropagator::new(self.l2_reg)?;

        let lr = self.learning_rate;
        if !lr.is_finite() || lr <= 0. {
            return Err(NetErr::config(format!(
                "learning rate must be a positive number, got {lr}"
            )));
        }

        Ok(())
    }

    pub(crate) fn adam(&self) -> AdamConfig {
        AdamConfig::with_learning_rate(self.learning_rate)
    }
}

/// A feedforward regression network: its parameters and the hyperparameters
/// it is trained with.
#[derive(Debug, Clone)]
pub struct Network {
    params: ParamStore,
    hyperparameters: Hyperparameters,
    forward: ForwardPropagator,
}

impl Network {
    /// Creates a new randomly initialized `Network`.
    ///
    /// # Arguments
    /// * `model` - The layer sizes.
    /// * `hyperparameters` - The hyperparameters.
    /// * `rng` - The generator the weights are sampled with.
    ///
    /// # Returns
    /// A new `Network` or `NetErr::InvalidConfiguration` if a size or hyperparameter is invalid.
    pub fn new<R: Rng + ?Sized>(
        model: &ModelConfig,
        hyperparameters: Hyperparameters,
        rng: &mut R,
    ) -> Result<Self> {
        hyperparameters.validate()?;
        let params = ParamStore::with_topology(model.topology()?, rng)?;
        Self::from_params(params, hyperparameters)
    }

    /// Creates a new randomly initialized `Network` seeding its own generator.
    ///
    /// # Arguments
    /// * `model` - The layer sizes.
    /// * `hyperparameters` - The hyperparameters.
    /// * `seed` - The seed of the generator, `None` draws it from the OS.
    pub fn init(
        model: &ModelConfig,
        hyperparameters: Hyperparameters,
        seed: Option<u64>,
    ) -> Result<Self> {
        let mut rng = generate_rng(seed);
        Self::new(model, hyperparameters, &mut rng)
    }

    /// Wraps existing parameters.
    pub fn from_params(params: ParamStore, hyperparameters: Hyperparameters) -> Result<Self> {
        hyperparameters.validate()?;
        let forward = ForwardPropagator::new(hyperparameters.dropout_rate)?;

        Ok(Self {
            params,
            hyperparameters,
            forward,
        })
    }

    /// Predicts the output of every row of `x`, no dropout is applied.
    ///
    /// # Returns
    /// The predictions or `NetErr::ShapeMismatch` if the width of `x` isn't the input size.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.forward.predict(&self.params, x)
    }

    /// Returns the mean squared error of the predictions for `x` against `y`.
    pub fn evaluate(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;

        if y.nrows() != y_pred.nrows() {
            return Err(NetErr::shape("target rows", y.nrows(), y_pred.nrows()));
        }

        if y.ncols() != y_pred.ncols() {
            return Err(NetErr::shape("target columns", y.ncols(), y_pred.ncols()));
        }

        Ok(Mse.loss(y_pred.view(), y))
    }

    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamStore {
        &mut self.params
    }

    pub fn into_params(self) -> ParamStore {
        self.params
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn forward(&self) -> &ForwardPropagator {
        &self.forward
    }

    pub fn topology(&self) -> &Topology {
        self.params.topology()
    }

    /// Returns the amount of layer transitions.
    pub fn layers(&self) -> usize {
        self.params.layers()
    }

    pub fn weight(&self, i: usize) -> Result<ArrayView2<'_, f64>> {
        self.params.get_weight(i)
    }

    pub fn bias(&self, i: usize) -> Result<ArrayView2<'_, f64>> {
        self.params.get_bias(i)
    }

    /// Copies the network into its persistence record.
    pub fn to_record(&self) -> ModelRecord {
        ModelRecord {
            layer_sizes: self.topology().sizes().to_vec(),
            hyperparameters: self.hyperparameters,
            layers: LayerRecord::from_params(&self.params),
        }
    }

    /// Rebuilds a network from its persistence record.
    ///
    /// # Returns
    /// The network, `NetErr::InvalidConfiguration` if the sizes or hyperparameters are
    /// invalid or `NetErr::ShapeMismatch` if the tensors don't follow the sizes.
    pub fn from_record(record: ModelRecord) -> Result<Self> {
        let topology = Topology::from_sizes(record.layer_sizes)?;
        let (weights, biases): (Vec<_>, Vec<_>) = record
            .layers
            .into_iter()
            .map(|layer| (layer.weights, layer.biases))
            .unzip();

        let params = ParamStore::from_parts(topology, weights, biases)?;
        Self::from_params(params, record.hyperparameters)
    }

    pub fn into_record(self) -> ModelRecord {
        let hyperparameters = self.hyperparameters;
        let (topology, weights, biases) = self.params.into_parts();

        ModelRecord {
            layer_sizes: topology.sizes().to_vec(),
            hyperparameters,
            layers: weights
                .into_iter()
                .zip(biases)
                .map(|(weights, biases)| LayerRecord { weights, biases })
                .collect(),
        }
    }
}

/// The tensors of a single layer transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub weights: Array2<f64>,
    pub biases: Array2<f64>,
}

impl LayerRecord {
    /// Copies every layer of `params`, input layer first.
    pub fn from_params(params: &ParamStore) -> Vec<Self> {
        (0..params.layers())
            .map(|i| Self {
                weights: params.weight(i).clone(),
                biases: params.bias(i).clone(),
            })
            .collect()
    }
}

/// Everything needed to rebuild a trained network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub layer_sizes: Vec<usize>,
    pub hyperparameters: Hyperparameters,
    pub layers: Vec<LayerRecord>,
}

/// Creates the generator of a run, seeded if asked to.
pub(crate) fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn network() -> Network {
        let model = ModelConfig::new(3, vec![4]);
        Network::init(&model, Hyperparameters::default(), Some(42)).unwrap()
    }

    #[test]
    fn same_seed_same_network() {
        assert_eq!(network().params(), network().params());
    }

    #[test]
    fn record_round_trips_through_json() {
        let net = network();

        let json = serde_json::to_string(&net.to_record()).unwrap();
        let record: ModelRecord = serde_json::from_str(&json).unwrap();
        let back = Network::from_record(record).unwrap();

        assert_eq!(back.params(), net.params());
        assert_eq!(back.hyperparameters(), net.hyperparameters());
        assert_eq!(net.clone().into_record(), net.to_record());
    }

    #[test]
    fn from_record_rejects_inconsistent_tensors() {
        let mut record = network().to_record();
        record.layers[1].weights = array![[1., 2., 3., 4.]];

        assert!(matches!(
            Network::from_record(record),
            Err(NetErr::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_invalid_hyperparameters() {
        let model = ModelConfig::new(3, vec![4]);
        for hyper in [
            Hyperparameters {
                learning_rate: 0.,
                ..Default::default()
            },
            Hyperparameters {
                dropout_rate: 1.,
                ..Default::default()
            },
            Hyperparameters {
                l2_reg: -1.,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                Network::init(&model, hyper, Some(0)),
                Err(NetErr::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn evaluate_is_the_mse_of_the_predictions() {
        let net = network();
        let x = array![[0.1, 0.2, 0.3], [0.3, 0.2, 0.1]];
        let y_pred = net.predict(x.view()).unwrap();
        let y = &y_pred + 1.;

        let loss = net.evaluate(x.view(), y.view()).unwrap();
        assert!((loss - 1.).abs() < 1e-12);
    }
}
