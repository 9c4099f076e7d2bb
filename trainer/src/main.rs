mod run;

use std::{env, fs, io};

use log::{debug, info};
use stock_net::{Network, RegressionMetrics, Trainer, training::ProgressFn};

use crate::run::{RunConfig, RunOutput};

const DEFAULT_OUTPUT: &str = "model.json";

fn main() -> io::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(run_path) = args.next() else {
        return Err(io::Error::other("usage: trainer <run.json> [output.json]"));
    };
    let out_path = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let run: RunConfig = serde_json::from_str(&fs::read_to_string(&run_path)?)?;
    let (x, y) = run.dataset.into_arrays()?;
    info!("loaded {} samples from {run_path}", x.nrows());

    let network = Network::init(&run.model, run.hyperparameters, run.trainer.seed)?;
    let mut trainer = Trainer::new(network, run.trainer)?;

    let mut progress = ProgressFn(|epoch: usize, train_loss: f64, val_loss: f64| {
        debug!(epoch = epoch, train_loss = train_loss, val_loss = val_loss; "epoch done");
    });
    let report = trainer.train_observed(x.view(), y.view(), &run.fit, &mut progress)?;

    let snapshots = trainer.take_snapshots();
    let network = trainer.into_network();
    let y_pred = network.predict(x.view())?;
    let metrics = RegressionMetrics::compute(y.view(), y_pred.view())?;

    info!(
        "{:?} after {} epochs: mse={:.6} rmse={:.6} mae={:.6} r2={:.4} mape={:.2}%",
        report.stop_reason,
        report.epochs_run,
        metrics.mse,
        metrics.rmse,
        metrics.mae,
        metrics.r2,
        metrics.mape
    );

    let output = RunOutput {
        report,
        metrics,
        model: network.into_record(),
        snapshots: snapshots.into_iter().map(Into::into).collect(),
    };

    fs::write(&out_path, serde_json::to_string_pretty(&output)?)?;
    info!("model written to {out_path}");

    Ok(())
}
