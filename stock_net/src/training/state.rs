use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The states a `Trainer` goes through.
///
/// `Idle -> Initializing -> EpochRunning -> Validating -> Improved | NoImprovement`, back to
/// `EpochRunning` until one of `EarlyStopped`, `MaxEpochsReached` or `Cancelled` and finally
/// `Finalized` once the best checkpoint is back in place.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainState {
    #[default]
    Idle,
    Initializing,
    EpochRunning,
    Validating,
    Improved,
    NoImprovement,
    EarlyStopped,
    MaxEpochsReached,
    Cancelled,
    Finalized,
}

impl Display for TrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrainState::Idle => "idle",
            TrainState::Initializing => "initializing",
            TrainState::EpochRunning => "epoch running",
            TrainState::Validating => "validating",
            TrainState::Improved => "improved",
            TrainState::NoImprovement => "no improvement",
            TrainState::EarlyStopped => "early stopped",
            TrainState::MaxEpochsReached => "max epochs reached",
            TrainState::Cancelled => "cancelled",
            TrainState::Finalized => "finalized",
        };

        f.write_str(name)
    }
}

/// Why a training run left its epoch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EarlyStopped,
    MaxEpochsReached,
    Cancelled,
}

impl From<StopReason> for TrainState {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::EarlyStopped => TrainState::EarlyStopped,
            StopReason::MaxEpochsReached => TrainState::MaxEpochsReached,
            StopReason::Cancelled => TrainState::Cancelled,
        }
    }
}
