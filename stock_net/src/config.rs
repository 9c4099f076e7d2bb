use serde::{Deserialize, Serialize};

use crate::{
    Result,
    optimization::StepCounting,
    params::Topology,
    training::SnapshotConfig,
};

/// The seed the validation split is drawn with unless told otherwise.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// The layer sizes of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub input_size: usize,
    #[serde(default)]
    pub hidden_sizes: Vec<usize>,
    #[serde(default = "default_output_size")]
    pub output_size: usize,
}

fn default_output_size() -> usize {
    1
}

impl ModelConfig {
    pub fn new(input_size: usize, hidden_sizes: Vec<usize>) -> Self {
        Self {
            input_size,
            hidden_sizes,
            output_size: default_output_size(),
        }
    }

    /// Builds the topology these sizes describe.
    pub fn topology(&self) -> Result<Topology> {
        Topology::new(self.input_size, &self.hidden_sizes, self.output_size)
    }
}

/// Settings of a `Trainer` that outlive a single `train` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// When the Adam step counter advances.
    pub step_counting: StepCounting,
    pub snapshots: SnapshotConfig,
    /// Seeds the shuffling and dropout generator, `None` draws it from the OS.
    pub seed: Option<u64>,
    /// Seeds the train/validation permutation.
    pub split_seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            step_counting: StepCounting::default(),
            snapshots: SnapshotConfig::default(),
            seed: None,
            split_seed: DEFAULT_SPLIT_SEED,
        }
    }
}

impl TrainerConfig {
    /// Returns the default configuration with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }
}
