mod backward;
mod dropout;
mod forward;
mod loss;

pub use backward::{BackPropagator, Gradients};
pub use dropout::Dropout;
pub use forward::{ForwardContext, ForwardPropagator};
pub use loss::{LossFn, Mse};
