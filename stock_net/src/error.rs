use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use rand_distr::{BernoulliError, NormalError};

/// The result type used in the entire network engine.
pub type Result<T> = std::result::Result<T, NetErr>;

/// The network engine's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum NetErr {
    /// A hyperparameter, topology or training setting is out of its valid domain.
    InvalidConfiguration(String),
    /// Two things that must agree on a size do not.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A batch without samples reached the backward pass.
    InvalidBatch,
    /// Too many consecutive batches produced a non finite loss or gradient.
    NumericInstability { consecutive: usize, epoch: usize },
}

impl NetErr {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn shape(what: &'static str, got: usize, expected: usize) -> Self {
        Self::ShapeMismatch {
            what,
            got,
            expected,
        }
    }
}

impl Display for NetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetErr::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            NetErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got}, expected {expected}"),
            NetErr::InvalidBatch => write!(f, "the batch reaching the backward pass is empty"),
            NetErr::NumericInstability { consecutive, epoch } => write!(
                f,
                "{consecutive} consecutive batches produced non finite values at epoch {epoch}"
            ),
        }
    }
}

impl Error for NetErr {}

impl From<NormalError> for NetErr {
    fn from(value: NormalError) -> Self {
        Self::InvalidConfiguration(value.to_string())
    }
}

impl From<BernoulliError> for NetErr {
    fn from(value: BernoulliError) -> Self {
        Self::InvalidConfiguration(value.to_string())
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<NetErr> for io::Error {
    fn from(value: NetErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, value)
    }
}
