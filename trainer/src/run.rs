use std::io;

use ndarray::{Array2, s};
use serde::{Deserialize, Serialize};

use stock_net::{
    FitConfig, Hyperparameters, ModelConfig, ModelRecord, RegressionMetrics, TrainReport,
    TrainerConfig,
    network::LayerRecord,
    training::{Granularity, Snapshot},
};

/// Where the samples of a run come from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetConfig {
    /// Row major samples, each made of `x_size` features followed by `y_size` targets.
    Inline {
        data: Vec<f64>,
        x_size: usize,
        y_size: usize,
    },
}

impl DatasetConfig {
    /// Splits the rows into features and targets.
    pub fn into_arrays(self) -> io::Result<(Array2<f64>, Array2<f64>)> {
        let DatasetConfig::Inline {
            data,
            x_size,
            y_size,
        } = self;

        let row_size = x_size + y_size;
        if x_size == 0 || y_size == 0 {
            return Err(invalid("x_size and y_size must be greater than 0"));
        }

        if data.len() % row_size != 0 {
            return Err(invalid(format!(
                "dataset length ({}) is not divisible by x_size + y_size ({row_size})",
                data.len()
            )));
        }

        let rows = data.len() / row_size;
        let full = Array2::from_shape_vec((rows, row_size), data).map_err(io::Error::other)?;

        let x = full.slice(s![.., ..x_size]).to_owned();
        let y = full.slice(s![.., x_size..]).to_owned();
        Ok((x, y))
    }
}

/// A training run description.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
    #[serde(default)]
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub fit: FitConfig,
    pub dataset: DatasetConfig,
}

/// What a run leaves behind.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub report: TrainReport,
    pub metrics: RegressionMetrics,
    pub model: ModelRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<SnapshotOutput>,
}

/// The parameters of a run at one recorded point of its trajectory.
#[derive(Debug, Serialize)]
pub struct SnapshotOutput {
    pub step: usize,
    pub granularity: Granularity,
    pub layers: Vec<LayerRecord>,
}

impl From<Snapshot> for SnapshotOutput {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            step: snapshot.step(),
            granularity: snapshot.granularity(),
            layers: LayerRecord::from_params(snapshot.params()),
        }
    }
}

fn invalid<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidInput, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stock_net::{Network, Trainer};

    #[test]
    fn parses_a_minimal_run() {
        let run: RunConfig = serde_json::from_str(
            r#"{
                "model": { "input_size": 2, "hidden_sizes": [3] },
                "fit": { "epochs": 5, "validation_split": 0.0 },
                "dataset": { "inline": { "data": [0, 0, 0, 1, 1, 0], "x_size": 2, "y_size": 1 } }
            }"#,
        )
        .unwrap();

        assert_eq!(run.fit.epochs, 5);
        assert_eq!(run.fit.batch_size, 32);
        assert_eq!(run.hyperparameters, Hyperparameters::default());

        let (x, y) = run.dataset.into_arrays().unwrap();
        assert_eq!(x.dim(), (2, 2));
        assert_eq!(y.column(0).to_vec(), [0., 0.]);
        assert_eq!(x.row(1).to_vec(), [1., 1.]);
    }

    #[test]
    fn snapshots_keep_their_step_and_tensors() {
        let run: RunConfig = serde_json::from_str(
            r#"{
                "model": { "input_size": 2, "hidden_sizes": [3] },
                "trainer": { "seed": 1, "snapshots": { "interval": 2 } },
                "fit": { "epochs": 5, "batch_size": 2, "validation_split": 0.0 },
                "dataset": { "inline": { "data": [0, 0, 0, 0, 1, 1, 1, 0, 1], "x_size": 2, "y_size": 1 } }
            }"#,
        )
        .unwrap();

        let (x, y) = run.dataset.into_arrays().unwrap();
        let network = Network::init(&run.model, run.hyperparameters, run.trainer.seed).unwrap();
        let mut trainer = Trainer::new(network, run.trainer).unwrap();
        trainer.train(x.view(), y.view(), &run.fit).unwrap();

        let snapshots = trainer.take_snapshots();
        let last = snapshots.last().unwrap().params().clone();
        let outputs: Vec<SnapshotOutput> = snapshots.into_iter().map(Into::into).collect();

        let steps: Vec<_> = outputs.iter().map(|s| s.step).collect();
        assert_eq!(steps, [0, 2, 4]);

        let layers = &outputs[2].layers;
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].weights, last.get_weight(1).unwrap());

        let json = serde_json::to_value(&outputs[0]).unwrap();
        assert_eq!(json["granularity"], "epoch");
    }

    #[test]
    fn rejects_ragged_datasets() {
        let dataset = DatasetConfig::Inline {
            data: vec![0.; 5],
            x_size: 2,
            y_size: 1,
        };
        assert_eq!(
            dataset.into_arrays().unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }
}
