//! Receding-horizon optimal control.
//!
//! # Architecture
//!
//! - [`OcpConfig`] describes one finite-horizon optimal control problem
//! - [`OcpSession`] transcribes it by direct multiple shooting into a
//!   parametric NLP that is built once and re-solved every sample
//! - [`NmpcController`] wraps a session with the compute / re-initialize
//!   cycle of a model predictive controller
//!
//! A session is a small state machine (`AwaitingSolve -> Solved ->
//! AwaitingSolve`); calling its operations out of order is an error instead
//! of a silent reuse of a stale plan.

pub mod config;
pub mod controller;
pub mod error;
pub mod transcriber;

pub use config::{BoxConstraints, OcpConfig, SolverKind, WarmStartStrategy};
pub use controller::{NmpcController, RecoveryPolicy};
pub use error::{ControlError, ControlResult};
pub use transcriber::{OcpSession, OcpSolution, Phase, StageLayout};
