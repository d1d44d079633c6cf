//! Problem interface consumed by the solver.

use crate::error::SolverResult;

/// A smooth NLP with equality constraints and simple variable bounds.
///
/// Infinite bounds mark unbounded sides. Output slices are sized by the
/// caller: `num_variables` for gradients and Jacobian products,
/// `num_constraints` for residuals.
pub trait NlpProblem {
    fn num_variables(&self) -> usize;

    fn num_constraints(&self) -> usize;

    fn lower_bounds(&self) -> Vec<f64>;

    fn upper_bounds(&self) -> Vec<f64>;

    fn objective(&self, z: &[f64]) -> SolverResult<f64>;

    fn gradient(&self, z: &[f64], grad: &mut [f64]) -> SolverResult<()>;

    /// Equality constraint residuals `c(z)`.
    fn constraints(&self, z: &[f64], c: &mut [f64]) -> SolverResult<()>;

    /// Transposed Jacobian product `J(z)^T d` with `J = dc/dz`.
    fn constraints_jacobian_tr_mul(&self, z: &[f64], d: &[f64], out: &mut [f64])
    -> SolverResult<()>;
}
