//! Error types for the nmpc-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one diagnostic surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Project(String),

    #[error("Runtime compilation failed: {0}")]
    Compile(String),

    #[error("Control error: {0}")]
    Control(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Plotting failed: {0}")]
    Plot(String),

    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for nmpc-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<nmpc_project::ProjectError> for AppError {
    fn from(err: nmpc_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<nmpc_controls::ControlError> for AppError {
    fn from(err: nmpc_controls::ControlError) -> Self {
        AppError::Control(err.to_string())
    }
}

impl From<nmpc_sim::SimError> for AppError {
    fn from(err: nmpc_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}
