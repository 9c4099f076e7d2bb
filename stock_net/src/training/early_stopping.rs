use crate::{NetErr, Result, params::ParamStore};

/// What an epoch's validation loss meant for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Strictly lower than every previous loss, the checkpoint was replaced.
    Improved,
    NoImprovement,
    /// The patience ran out.
    Stop,
}

/// Tracks the best validation loss of a run together with a copy of the parameters
/// that produced it.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: Option<usize>,
    counter: usize,
    best_loss: f64,
    best_epoch: Option<usize>,
    checkpoint: ParamStore,
}

impl EarlyStopping {
    /// Creates a new `EarlyStopping`.
    ///
    /// The initial parameters are checkpointed with an infinite loss, so any finite
    /// validation loss improves on them.
    ///
    /// # Arguments
    /// * `initial` - The parameters before training.
    /// * `patience` - The amount of epochs without improvement to stop after, `None` never stops.
    ///
    /// # Returns
    /// A new `EarlyStopping` or `NetErr::InvalidConfiguration` if the patience is zero.
    pub fn new(initial: &ParamStore, patience: Option<usize>) -> Result<Self> {
        if patience == Some(0) {
            return Err(NetErr::config("early stopping patience must be greater than 0"));
        }

        Ok(Self {
            patience,
            counter: 0,
            best_loss: f64::INFINITY,
            best_epoch: None,
            checkpoint: initial.clone(),
        })
    }

    /// Records the validation loss of an epoch.
    ///
    /// # Arguments
    /// * `epoch` - The epoch the loss belongs to.
    /// * `loss` - The validation loss.
    /// * `params` - The parameters the loss was measured with.
    pub fn observe(&mut self, epoch: usize, loss: f64, params: &ParamStore) -> Verdict {
        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_epoch = Some(epoch);
            self.checkpoint.clone_from(params);
            self.counter = 0;
            return Verdict::Improved;
        }

        self.counter += 1;

        match self.patience {
            Some(patience) if self.counter >= patience => Verdict::Stop,
            _ => Verdict::NoImprovement,
        }
    }

    /// Copies the checkpoint back into `params`.
    pub fn restore_into(&self, params: &mut ParamStore) -> Result<()> {
        params.restore(&self.checkpoint)
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    /// Returns the epoch of the checkpoint, `None` if it still holds the initial parameters.
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn checkpoint(&self) -> &ParamStore {
        &self.checkpoint
    }

    /// Returns the amount of epochs since the last improvement.
    pub fn counter(&self) -> usize {
        self.counter
    }
}
