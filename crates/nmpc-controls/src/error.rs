//! Error types for optimal control operations.

use nmpc_sim::SimError;
use nmpc_solver::SolverError;
use thiserror::Error;

use crate::transcriber::Phase;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while building or running a controller.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    Dimension {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Index {index} of {what} outside [0, {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Session operation called in the wrong phase.
    #[error("Ordering violation: operation requires phase {expected}, session is {found}")]
    Ordering { expected: Phase, found: Phase },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),
}
