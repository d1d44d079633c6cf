//! nmpc-core: shared foundation for the NMPC workspace.
//!
//! Contains:
//! - numeric (Real + finiteness and length checks)
//! - scalar (`DualNum` alias shared by numeric and AD evaluation)
//! - linalg (small dense solves written against `Scalar`)
//! - error (shared error types)

pub mod error;
pub mod linalg;
pub mod numeric;
pub mod scalar;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use linalg::linsolve;
pub use numeric::*;
pub use scalar::{Dual64, DualNum, Scalar};
