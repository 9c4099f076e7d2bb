use std::num::NonZeroUsize;

use log::{debug, info, warn};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{
    Dataset, EarlyStopping, EpochRecord, EpochReport, History, Snapshot, SnapshotRecorder,
    StopReason, TrainObserver, TrainState, Verdict,
};
use crate::{
    NetErr, Result,
    arch::{BackPropagator, ForwardPropagator, LossFn, Mse},
    config::TrainerConfig,
    network::{Network, generate_rng},
    optimization::{Adam, AdamConfig, Optimizer},
};

/// The amount of consecutive batches with a non finite loss or gradient a run
/// tolerates before failing with `NetErr::NumericInstability`.
pub const MAX_CONSECUTIVE_NONFINITE: usize = 8;

const LOG_EVERY: usize = 10;

/// The settings of a single `train` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Share of the samples held out for validation, in `[0, 1)`.
    pub validation_split: f64,
    /// Epochs without improvement to stop after, `None` runs every epoch.
    pub early_stopping_patience: Option<usize>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            validation_split: 0.2,
            early_stopping_patience: Some(10),
        }
    }
}

/// The outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainReport {
    pub history: History,
    /// The epoch whose parameters were restored, `None` if no epoch improved on the
    /// initial parameters.
    pub best_epoch: Option<usize>,
    pub best_validation_loss: f64,
    pub stop_reason: StopReason,
    pub epochs_run: usize,
    pub optimizer_steps: usize,
    pub skipped_batches: usize,
}

/// Counts optimizer steps and skipped batches.
#[derive(Debug, Default)]
struct BatchCounters {
    steps: usize,
    skipped: usize,
    consecutive: usize,
}

impl BatchCounters {
    fn step(&mut self) {
        self.steps += 1;
        self.consecutive = 0;
    }

    fn skip(&mut self, epoch: usize) -> Result<()> {
        self.skipped += 1;
        self.consecutive += 1;

        warn!(
            epoch = epoch,
            consecutive = self.consecutive;
            "skipping batch with a non finite loss or gradient"
        );

        if self.consecutive >= MAX_CONSECUTIVE_NONFINITE {
            return Err(NetErr::NumericInstability {
                consecutive: self.consecutive,
                epoch,
            });
        }

        Ok(())
    }
}

/// The per run components of a `train` call.
struct Run {
    train: Dataset,
    validation: Option<Dataset>,
    batch_size: NonZeroUsize,
    forward: ForwardPropagator,
    backward: BackPropagator,
    early: EarlyStopping,
    counters: BatchCounters,
    epochs_run: usize,
}

/// Trains a `Network` with mini-batch Adam, early stopping and snapshots.
///
/// The optimizer state lives as long as the trainer, so consecutive `train` calls
/// continue from the moments and step count the previous one left behind.
pub struct Trainer {
    network: Network,
    optimizer: Adam,
    config: TrainerConfig,
    state: TrainState,
    history: History,
    snapshots: SnapshotRecorder,
    rng: StdRng,
}

impl Trainer {
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `network` - The network to train.
    /// * `config` - The settings shared by every run.
    ///
    /// # Returns
    /// A new `Trainer` or `NetErr::InvalidConfiguration` if the snapshot settings or the
    /// optimizer hyperparameters are invalid.
    pub fn new(network: Network, config: TrainerConfig) -> Result<Self> {
        let snapshots = SnapshotRecorder::new(config.snapshots)?;
        let rng = generate_rng(config.seed);

        let adam_config = AdamConfig {
            step_counting: config.step_counting,
            ..network.hyperparameters().adam()
        };
        let optimizer = Adam::new(network.params(), adam_config)?;

        Ok(Self {
            network,
            optimizer,
            config,
            state: TrainState::Idle,
            history: History::new(),
            snapshots,
            rng,
        })
    }

    pub fn state(&self) -> TrainState {
        self.state
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Returns the history of the last run.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Returns the snapshots of the last run.
    pub fn snapshots(&self) -> &[Snapshot] {
        self.snapshots.snapshots()
    }

    pub fn take_snapshots(&mut self) -> Vec<Snapshot> {
        self.snapshots.take()
    }

    pub fn optimizer(&self) -> &Adam {
        &self.optimizer
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Trains the network.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    /// * `y` - The targets, one per row.
    /// * `fit` - The settings of this run.
    ///
    /// # Returns
    /// The report of the run. On return the network holds the parameters with the
    /// lowest validation loss seen.
    pub fn train(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        fit: &FitConfig,
    ) -> Result<TrainReport> {
        self.train_observed(x, y, fit, &mut ())
    }

    /// Trains the network reporting every epoch to `observer`, which may also cancel the run.
    ///
    /// # Returns
    /// The report of the run, `NetErr::InvalidConfiguration` or `NetErr::ShapeMismatch` if
    /// the inputs are invalid, in which case the parameters are untouched, or
    /// `NetErr::NumericInstability` once too many consecutive batches were skipped, in
    /// which case the best parameters so far are restored first.
    pub fn train_observed<O>(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        fit: &FitConfig,
        observer: &mut O,
    ) -> Result<TrainReport>
    where
        O: TrainObserver + ?Sized,
    {
        self.validate(x, y, fit)?;
        self.transition(TrainState::Initializing);

        self.history.clear();
        self.snapshots.clear();

        let mut run = self.prepare(x, y, fit)?;
        let outcome = self.run_epochs(&mut run, fit, observer);

        run.early.restore_into(self.network.params_mut())?;
        self.transition(TrainState::Finalized);

        let stop_reason = outcome?;

        info!(
            epochs = run.epochs_run,
            best_epoch = run.early.best_epoch().unwrap_or_default(),
            best_loss = run.early.best_loss();
            "training finished: {stop_reason:?}"
        );

        Ok(TrainReport {
            history: self.history.clone(),
            best_epoch: run.early.best_epoch(),
            best_validation_loss: run.early.best_loss(),
            stop_reason,
            epochs_run: run.epochs_run,
            optimizer_steps: run.counters.steps,
            skipped_batches: run.counters.skipped,
        })
    }

    fn validate(&self, x: ArrayView2<f64>, y: ArrayView2<f64>, fit: &FitConfig) -> Result<()> {
        if fit.epochs == 0 {
            return Err(NetErr::config("epochs must be greater than 0"));
        }

        if fit.batch_size == 0 {
            return Err(NetErr::config("batch size must be greater than 0"));
        }

        if fit.early_stopping_patience == Some(0) {
            return Err(NetErr::config("early stopping patience must be greater than 0"));
        }

        if !(0. ..1.).contains(&fit.validation_split) {
            return Err(NetErr::config(format!(
                "validation split must be in [0, 1), got {}",
                fit.validation_split
            )));
        }

        let n = x.nrows();
        if n == 0 {
            return Err(NetErr::config("there are no samples to train with"));
        }

        if y.nrows() != n {
            return Err(NetErr::shape("target rows", y.nrows(), n));
        }

        let n_val = (n as f64 * fit.validation_split) as usize;
        if n_val == n {
            return Err(NetErr::config(
                "the validation split leaves no samples to train with",
            ));
        }

        let topology = self.network.topology();

        if x.ncols() != topology.input_size() {
            return Err(NetErr::shape("input width", x.ncols(), topology.input_size()));
        }

        if y.ncols() != topology.output_size() {
            return Err(NetErr::shape("target width", y.ncols(), topology.output_size()));
        }

        Ok(())
    }

    fn prepare(&self, x: ArrayView2<f64>, y: ArrayView2<f64>, fit: &FitConfig) -> Result<Run> {
        let data = Dataset::new(x.to_owned(), y.to_owned())?;
        let (train, validation) = data.split(fit.validation_split, self.config.split_seed)?;

        let batch_size = NonZeroUsize::new(fit.batch_size)
            .ok_or_else(|| NetErr::config("batch size must be greater than 0"))?;

        let hyper = self.network.hyperparameters();
        let params = self.network.params();

        debug!(
            train = train.len(),
            validation = validation.as_ref().map_or(0, Dataset::len),
            num_params = params.num_params();
            "split dataset"
        );

        Ok(Run {
            train,
            validation,
            batch_size,
            forward: ForwardPropagator::new(hyper.dropout_rate)?,
            backward: BackPropagator::new(hyper.l2_reg)?,
            early: EarlyStopping::new(params, fit.early_stopping_patience)?,
            counters: BatchCounters::default(),
            epochs_run: 0,
        })
    }

    fn run_epochs<O>(
        &mut self,
        run: &mut Run,
        fit: &FitConfig,
        observer: &mut O,
    ) -> Result<StopReason>
    where
        O: TrainObserver + ?Sized,
    {
        for epoch in 0..fit.epochs {
            if observer.should_stop() {
                return self.stop(StopReason::Cancelled);
            }

            self.transition(TrainState::EpochRunning);
            let training_loss = self.run_epoch(run, epoch)?;
            run.epochs_run += 1;

            self.transition(TrainState::Validating);
            let validation = run.validation.as_ref().unwrap_or(&run.train);
            let y_pred = run.forward.predict(self.network.params(), validation.x())?;
            let validation_loss = Mse.loss(y_pred.view(), validation.y());

            let record = EpochRecord {
                epoch,
                training_loss,
                validation_loss,
            };
            self.history.push(record);

            let verdict = run.early.observe(epoch, validation_loss, self.network.params());
            self.transition(match verdict {
                Verdict::Improved => TrainState::Improved,
                _ => TrainState::NoImprovement,
            });

            self.snapshots
                .on_epoch_end(epoch, fit.epochs, self.network.params());

            observer.on_epoch(&EpochReport {
                record: &record,
                epochs: fit.epochs,
                params: self.network.params(),
            });

            if epoch % LOG_EVERY == 0 || epoch + 1 == fit.epochs {
                info!(
                    "epoch {}/{}: train_loss={training_loss:.6} val_loss={validation_loss:.6}",
                    epoch + 1,
                    fit.epochs
                );
            }

            if verdict == Verdict::Stop {
                info!("early stopping at epoch {epoch}");
                return self.stop(StopReason::EarlyStopped);
            }
        }

        self.stop(StopReason::MaxEpochsReached)
    }

    /// Runs every mini-batch of an epoch.
    ///
    /// # Returns
    /// The mean loss of the batches that weren't skipped, `NaN` if all of them were.
    fn run_epoch(&mut self, run: &mut Run, epoch: usize) -> Result<f64> {
        run.train.shuffle(&mut self.rng);

        let mut total_loss = 0.;
        let mut num_batches = 0;

        for (x, y) in run.train.batches(run.batch_size) {
            let params = self.network.params();
            let (y_pred, ctx) = run.forward.forward(params, x.view(), true, &mut self.rng)?;
            let loss = Mse.loss(y_pred.view(), y.view());
            let grads = run.backward.backward(params, &ctx, y_pred.view(), y.view())?;

            if !loss.is_finite() || !grads.is_finite() {
                run.counters.skip(epoch)?;
                continue;
            }

            self.optimizer.update_params(self.network.params_mut(), &grads)?;
            run.counters.step();
            self.snapshots
                .on_step(run.counters.steps, self.network.params());

            total_loss += loss;
            num_batches += 1;
        }

        if num_batches == 0 {
            return Ok(f64::NAN);
        }

        Ok(total_loss / num_batches as f64)
    }

    fn stop(&mut self, reason: StopReason) -> Result<StopReason> {
        self.transition(reason.into());
        Ok(reason)
    }

    fn transition(&mut self, next: TrainState) {
        debug!("trainer state: {} -> {next}", self.state);
        self.state = next;
    }
}
