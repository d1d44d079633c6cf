//! Nonlinear programming backend for the optimal control transcription.
//!
//! Solves problems of the form
//!
//! ```text
//! min f(z)   s.t.   c(z) = 0,   lb <= z <= ub
//! ```
//!
//! on top of `optimization_engine`. The equality constraints are handled
//! either by the augmented Lagrangian method (`c` mapped onto the set
//! `{0}`) or by a quadratic penalty; each subproblem is a box-constrained
//! smooth problem solved by PANOC. The constraint Jacobian is only ever
//! used as a transposed product `J(z)^T d`, so it is never stored.

pub mod alm;
pub mod error;
pub mod problem;

pub use alm::{AlmConfig, Method, NlpSolution, WarmStart, solve};
pub use error::{SolverError, SolverResult};
pub use problem::NlpProblem;
