//! Error types for NLP solving.

use nmpc_core::CoreError;
use thiserror::Error;

/// Errors that can occur while setting up or solving an NLP.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Problem evaluation failed: {what}")]
    Evaluation { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type SolverResult<T> = Result<T, SolverError>;
