use super::EpochRecord;
use crate::params::ParamStore;

/// What a `TrainObserver` gets to see after every epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochReport<'a> {
    pub record: &'a EpochRecord,
    pub epochs: usize,
    pub params: &'a ParamStore,
}

/// Watches a training run as it goes and may cancel it.
pub trait TrainObserver {
    /// Called once the validation loss of an epoch is known.
    fn on_epoch(&mut self, report: &EpochReport<'_>);

    /// Checked before every epoch, returning `true` cancels the run.
    fn should_stop(&self) -> bool {
        false
    }
}

impl TrainObserver for () {
    fn on_epoch(&mut self, _: &EpochReport<'_>) {}
}

/// Adapts a `(epoch, training_loss, validation_loss)` callback into an observer.
pub struct ProgressFn<F>(pub F);

impl<F> TrainObserver for ProgressFn<F>
where
    F: FnMut(usize, f64, f64),
{
    fn on_epoch(&mut self, report: &EpochReport<'_>) {
        let EpochRecord {
            epoch,
            training_loss,
            validation_loss,
        } = *report.record;

        (self.0)(epoch, training_loss, validation_loss);
    }
}
