//! Application service layer for closed-loop NMPC runs.
//!
//! Shared by the CLI: turns configuration files into a controller and a
//! plant simulator, drives the closed loop and writes plots and exports.

pub mod closed_loop;
pub mod compile;
pub mod error;
pub mod plot;
pub mod run_service;

// Re-export key types for convenience
pub use closed_loop::{run_closed_loop, ClosedLoopRecord};
pub use compile::{cstr_model, dipc_model, load_model, ocp_config, sim_params};
pub use error::{AppError, AppResult};
pub use plot::plot_record;
pub use run_service::{run, RunOptions, RunRequest, RunResponse, RunTimingSummary};
