//! Plant dynamics, time discretization and plant simulation.
//!
//! Provides:
//! - `DynamicsModel` trait with a closed set of plants (CSTR, DIPC)
//! - Fixed-step Forward Euler and RK4 integrators, generic over `Scalar`
//! - Plant simulator advancing the "true" model one sample at a time

pub mod cstr;
pub mod dipc;
pub mod error;
pub mod integrator;
pub mod model;
pub mod sim;

// Re-exports for public API
pub use cstr::{CstrModel, CstrParams};
pub use dipc::{DipcModel, DipcParams};
pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, IntegratorType, RK4};
pub use model::{DynamicsModel, Model, ModelKind};
pub use sim::{SimParams, Simulator};
