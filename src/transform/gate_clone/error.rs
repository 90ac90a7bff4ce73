use thiserror::Error;

use crate::netlist::NetlistError;
use crate::steiner::SteinerPoint;

/// Malformed arguments to the `gate_clone` transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("expected at most 2 arguments, got {0}")]
    TooManyArguments(usize),

    #[error("expected number for max-cap-factor, got `{0}`")]
    ExpectedNumber(String),

    #[error("expected boolean for clone-largest-only, got `{0}`")]
    ExpectedBoolean(String),
}

/// An inconsistency found while cloning one driver. The driver is left as it
/// was and the pass moves on.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("driver point carries no pin")]
    DriverWithoutPin,

    #[error("driver pin does not belong to an instance")]
    DriverNotOnInstance,

    #[error("driver pin is not connected to a net")]
    DriverUnconnected,

    #[error("leaf {0:?} carries no pin")]
    LeafWithoutPin(SteinerPoint),

    #[error("pin `{0}` is no longer on the driver's net")]
    StalePin(String),

    #[error("netlist error: {0}")]
    Netlist(#[from] NetlistError),
}

pub type CloneResult<T> = std::result::Result<T, CloneError>;
