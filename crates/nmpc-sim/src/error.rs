//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while evaluating dynamics or simulating the plant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    Dimension {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: String },

    #[error("Unknown {what}: {name}")]
    Unknown { what: &'static str, name: String },

    #[error(transparent)]
    Core(#[from] nmpc_core::CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
