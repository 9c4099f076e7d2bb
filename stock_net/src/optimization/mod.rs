mod adam;
mod optimizer;

pub use adam::{Adam, AdamConfig, StepCounting};
pub use optimizer::Optimizer;
