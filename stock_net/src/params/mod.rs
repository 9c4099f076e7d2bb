mod init;
mod store;
mod topology;

pub use init::RandWeightGen;
pub use store::ParamStore;
pub use topology::Topology;
