pub mod arch;
pub mod config;
mod error;
pub mod metrics;
pub mod network;
pub mod optimization;
pub mod params;
pub mod training;

pub use config::{ModelConfig, TrainerConfig};
pub use error::{NetErr, Result};
pub use metrics::RegressionMetrics;
pub use network::{Hyperparameters, ModelRecord, Network};
pub use training::{FitConfig, TrainReport, Trainer};
