use serde::{Deserialize, Serialize};

use crate::{NetErr, Result, params::ParamStore};

/// What the step index of a snapshot counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Zero based epochs.
    #[default]
    Epoch,
    /// Successful optimizer steps, starting at one.
    Step,
}

/// When the parameter trajectory of a run is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub save_history: bool,
    pub interval: usize,
    pub granularity: Granularity,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            save_history: true,
            interval: 10,
            granularity: Granularity::Epoch,
        }
    }
}

impl SnapshotConfig {
    /// A configuration that records nothing.
    pub fn disabled() -> Self {
        Self {
            save_history: false,
            ..Default::default()
        }
    }
}

/// An immutable copy of the parameters at some point of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    step: usize,
    granularity: Granularity,
    params: ParamStore,
}

impl Snapshot {
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    pub fn into_params(self) -> ParamStore {
        self.params
    }
}

/// Records snapshots of the parameters at a fixed interval.
#[derive(Debug, Clone)]
pub struct SnapshotRecorder {
    config: SnapshotConfig,
    snapshots: Vec<Snapshot>,
}

impl SnapshotRecorder {
    /// Creates a new `SnapshotRecorder`.
    ///
    /// # Returns
    /// A new `SnapshotRecorder` or `NetErr::InvalidConfiguration` if history is saved
    /// with a zero interval.
    pub fn new(config: SnapshotConfig) -> Result<Self> {
        if config.save_history && config.interval == 0 {
            return Err(NetErr::config("snapshot interval must be greater than 0"));
        }

        Ok(Self {
            config,
            snapshots: Vec::new(),
        })
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Called once an epoch is over. With epoch granularity it captures epoch `epoch`
    /// when it is a multiple of the interval or the last one of the run.
    ///
    /// # Arguments
    /// * `epoch` - The zero based epoch that just ended.
    /// * `epochs` - The amount of epochs of the run.
    /// * `params` - The current parameters.
    pub fn on_epoch_end(&mut self, epoch: usize, epochs: usize, params: &ParamStore) {
        if !self.records(Granularity::Epoch) {
            return;
        }

        if epoch % self.config.interval == 0 || epoch + 1 == epochs {
            self.capture(epoch, params);
        }
    }

    /// Called after every successful optimizer step. With step granularity it captures
    /// every `interval`-th step.
    ///
    /// # Arguments
    /// * `step` - The amount of successful steps so far in the run.
    /// * `params` - The current parameters.
    pub fn on_step(&mut self, step: usize, params: &ParamStore) {
        if self.records(Granularity::Step) && step % self.config.interval == 0 {
            self.capture(step, params);
        }
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Moves the recorded snapshots out, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<Snapshot> {
        std::mem::take(&mut self.snapshots)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    fn records(&self, granularity: Granularity) -> bool {
        self.config.save_history && self.config.granularity == granularity
    }

    fn capture(&mut self, step: usize, params: &ParamStore) {
        self.snapshots.push(Snapshot {
            step,
            granularity: self.config.granularity,
            params: params.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params() -> ParamStore {
        let mut rng = StdRng::seed_from_u64(0);
        ParamStore::initialize(2, &[2], 1, &mut rng).unwrap()
    }

    fn steps(snapshots: &[Snapshot]) -> Vec<usize> {
        snapshots.iter().map(|s| s.step()).collect()
    }

    #[test]
    fn epoch_snapshots_follow_the_interval_and_the_last_epoch() {
        let params = params();
        let mut recorder = SnapshotRecorder::new(SnapshotConfig::default()).unwrap();

        for epoch in 0..25 {
            recorder.on_epoch_end(epoch, 25, &params);
            recorder.on_step(epoch + 1, &params);
        }

        assert_eq!(steps(recorder.snapshots()), [0, 10, 20, 24]);
        assert!(recorder.snapshots().iter().all(|s| s.granularity() == Granularity::Epoch));
    }

    #[test]
    fn step_snapshots_follow_the_interval() {
        let params = params();
        let config = SnapshotConfig {
            interval: 3,
            granularity: Granularity::Step,
            ..Default::default()
        };
        let mut recorder = SnapshotRecorder::new(config).unwrap();

        for step in 1..=10 {
            recorder.on_step(step, &params);
        }
        recorder.on_epoch_end(0, 1, &params);

        assert_eq!(steps(recorder.snapshots()), [3, 6, 9]);
    }

    #[test]
    fn disabled_recorder_is_a_no_op() {
        let params = params();
        let mut recorder = SnapshotRecorder::new(SnapshotConfig::disabled()).unwrap();

        for epoch in 0..5 {
            recorder.on_epoch_end(epoch, 5, &params);
        }

        assert!(recorder.snapshots().is_empty());
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut params = params();
        let mut recorder = SnapshotRecorder::new(SnapshotConfig::default()).unwrap();

        recorder.on_epoch_end(0, 2, &params);
        let before = params.clone();
        params.tensors_mut().for_each(|t| t.fill(3.));

        let taken = recorder.take();
        assert_eq!(taken[0].params(), &before);
        assert!(recorder.snapshots().is_empty());
    }

    #[test]
    fn rejects_zero_interval() {
        let config = SnapshotConfig {
            interval: 0,
            ..Default::default()
        };
        assert!(SnapshotRecorder::new(config).is_err());

        let ignored = SnapshotConfig {
            interval: 0,
            save_history: false,
            ..Default::default()
        };
        assert!(SnapshotRecorder::new(ignored).is_ok());
    }
}
