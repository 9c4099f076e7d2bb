mod dataset;
mod early_stopping;
mod history;
mod observer;
mod snapshot;
mod state;
mod trainer;

pub use dataset::Dataset;
pub use early_stopping::{EarlyStopping, Verdict};
pub use history::{EpochRecord, History};
pub use observer::{EpochReport, ProgressFn, TrainObserver};
pub use snapshot::{Granularity, Snapshot, SnapshotConfig, SnapshotRecorder};
pub use state::{StopReason, TrainState};
pub use trainer::{FitConfig, MAX_CONSECUTIVE_NONFINITE, TrainReport, Trainer};
