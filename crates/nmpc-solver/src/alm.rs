//! Augmented Lagrangian and quadratic penalty solves on `optimization_engine`.
//!
//! Both methods wrap the problem into a sequence of box-constrained
//! subproblems solved by PANOC:
//!
//! ```text
//! ALM:      psi(z) = f(z) + c/2 ||c(z) + y/c||^2,   y <- y + c c(z)
//! penalty:  psi(z) = f(z) + c/2 ||c(z)||^2
//! ```
//!
//! The penalty `c` grows by `penalty_update_factor` whenever the
//! infeasibility does not shrink fast enough. A solve seeded with the
//! multipliers and penalty of a previous solve starts at the final inner
//! tolerance, so a point that is already optimal is accepted after a few
//! inner iterations.

use std::cell::RefCell;

use nmpc_core::{ensure_all_finite, ensure_len};
use optimization_engine::alm::{
    AlmCache, AlmFactory, AlmOptimizer, AlmProblem, NO_JACOBIAN_MAPPING, NO_MAPPING, NO_SET,
};
use optimization_engine::constraints::{BallInf, Rectangle, Zero};
use optimization_engine::core::ExitStatus;
use optimization_engine::panoc::PANOCCache;
use optimization_engine::{FunctionCallResult, SolverError as EngineError};
use tracing::{debug, trace};

use crate::error::{SolverError, SolverResult};
use crate::problem::NlpProblem;

/// How the equality constraints enter the subproblems.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Method {
    /// Constraints mapped onto `{0}` with first-order multiplier updates.
    #[default]
    AugmentedLagrangian,
    /// Constraints squared into the cost, no multipliers.
    QuadraticPenalty,
}

/// Solver configuration.
#[derive(Clone, Debug)]
pub struct AlmConfig {
    pub method: Method,
    /// Final tolerance of the inner PANOC solves
    pub tol: f64,
    /// Accepted constraint violation `||c(z)||`
    pub constraint_tol: f64,
    pub max_outer_iterations: usize,
    /// PANOC iteration limit per subproblem
    pub max_inner_iterations: usize,
    pub lbfgs_memory: usize,
    pub initial_penalty: f64,
    pub penalty_update_factor: f64,
    /// Inner tolerance of the first subproblem of a cold solve
    pub initial_inner_tolerance: f64,
    pub inner_tolerance_update_factor: f64,
    /// Required infeasibility decrease before the penalty is left alone
    pub sufficient_decrease: f64,
    /// Radius of the box multipliers are projected onto
    pub max_multiplier: f64,
}

impl Default for AlmConfig {
    fn default() -> Self {
        Self {
            method: Method::AugmentedLagrangian,
            tol: 1e-6,
            constraint_tol: 1e-6,
            max_outer_iterations: 50,
            max_inner_iterations: 2000,
            lbfgs_memory: 10,
            initial_penalty: 10.0,
            penalty_update_factor: 5.0,
            initial_inner_tolerance: 1e-2,
            inner_tolerance_update_factor: 0.1,
            sufficient_decrease: 0.1,
            max_multiplier: 1e12,
        }
    }
}

impl AlmConfig {
    fn validate(&self) -> SolverResult<()> {
        let positive = [
            self.tol,
            self.constraint_tol,
            self.initial_penalty,
            self.initial_inner_tolerance,
            self.max_multiplier,
        ];
        if positive.iter().any(|v| !(*v > 0.0) || !v.is_finite()) {
            return Err(SolverError::ProblemSetup {
                what: "tolerances, penalty and multiplier radius must be positive".to_string(),
            });
        }
        if self.max_outer_iterations == 0 || self.max_inner_iterations == 0 || self.lbfgs_memory == 0
        {
            return Err(SolverError::ProblemSetup {
                what: "iteration limits and L-BFGS memory must be positive".to_string(),
            });
        }
        if !(self.penalty_update_factor > 1.0) {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "penalty update factor must exceed 1, got {}",
                    self.penalty_update_factor
                ),
            });
        }
        let in_unit = |v: f64| v > 0.0 && v < 1.0;
        if !in_unit(self.inner_tolerance_update_factor) || !in_unit(self.sufficient_decrease) {
            return Err(SolverError::ProblemSetup {
                what: "inner tolerance factor and sufficient decrease must lie in (0, 1)"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Dual information carried from one solve to the next.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WarmStart {
    /// Equality multipliers, one per constraint
    pub multipliers: Option<Vec<f64>>,
    pub penalty: Option<f64>,
}

/// Result of a converged solve.
#[derive(Clone, Debug)]
pub struct NlpSolution {
    /// Primal solution
    pub z: Vec<f64>,
    /// Equality multipliers of the Lagrangian `f + y^T c`. For the penalty
    /// method these are the implied estimates `c * c(z)`.
    pub multipliers: Vec<f64>,
    pub penalty: f64,
    pub objective: f64,
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    /// Max-norm of `c(z)`
    pub infeasibility: f64,
}

impl NlpSolution {
    /// Seed for a subsequent solve of the same (or a shifted) problem.
    pub fn warm_start(&self) -> WarmStart {
        WarmStart {
            multipliers: Some(self.multipliers.clone()),
            penalty: Some(self.penalty),
        }
    }
}

/// Adapts an [`NlpProblem`] to the engine's callback signature.
///
/// The engine only understands an opaque failure, so the first error raised
/// by the problem is kept here and handed back to the caller.
struct Callbacks<'a, P> {
    problem: &'a P,
    failure: RefCell<Option<SolverError>>,
}

impl<'a, P: NlpProblem> Callbacks<'a, P> {
    fn new(problem: &'a P) -> Self {
        Self {
            problem,
            failure: RefCell::new(None),
        }
    }

    fn record(&self, result: SolverResult<()>) -> FunctionCallResult {
        result.map_err(|err| {
            let mut slot = self.failure.borrow_mut();
            if slot.is_none() {
                *slot = Some(err);
            }
            EngineError::Cost
        })
    }

    fn cost(&self, z: &[f64], cost: &mut f64) -> FunctionCallResult {
        self.record(self.problem.objective(z).map(|v| *cost = v))
    }

    fn gradient(&self, z: &[f64], grad: &mut [f64]) -> FunctionCallResult {
        self.record(self.problem.gradient(z, grad))
    }

    fn constraints(&self, z: &[f64], c: &mut [f64]) -> FunctionCallResult {
        self.record(self.problem.constraints(z, c))
    }

    fn jacobian_tr(&self, z: &[f64], d: &[f64], out: &mut [f64]) -> FunctionCallResult {
        self.record(self.problem.constraints_jacobian_tr_mul(z, d, out))
    }

    fn error(&self, err: EngineError) -> SolverError {
        self.failure
            .borrow_mut()
            .take()
            .unwrap_or_else(|| SolverError::Numeric {
                what: format!("optimization engine failed: {err:?}"),
            })
    }
}

/// Starting values of one engine run.
struct Seed<'a> {
    lower: &'a [f64],
    upper: &'a [f64],
    multipliers: &'a [f64],
    penalty: f64,
    inner_tolerance: f64,
}

/// What the engine reports back.
struct EngineRun {
    exit: ExitStatus,
    outer: usize,
    inner: usize,
    multipliers: Option<Vec<f64>>,
    penalty: f64,
}

fn run_augmented_lagrangian<P: NlpProblem>(
    callbacks: &Callbacks<'_, P>,
    z: &mut [f64],
    seed: &Seed<'_>,
    config: &AlmConfig,
) -> Result<EngineRun, EngineError> {
    let n = z.len();
    let m = seed.multipliers.len();
    let f = |u: &[f64], cost: &mut f64| callbacks.cost(u, cost);
    let df = |u: &[f64], grad: &mut [f64]| callbacks.gradient(u, grad);
    let f1 = |u: &[f64], res: &mut [f64]| callbacks.constraints(u, res);
    let jf1_tr = |u: &[f64], d: &[f64], res: &mut [f64]| callbacks.jacobian_tr(u, d, res);

    let factory = AlmFactory::new(
        f,
        df,
        Some(f1),
        Some(jf1_tr),
        NO_MAPPING,
        NO_JACOBIAN_MAPPING,
        Some(Zero::new()),
        0,
    );
    let psi = |u: &[f64], xi: &[f64], cost: &mut f64| factory.psi(u, xi, cost);
    let d_psi = |u: &[f64], xi: &[f64], grad: &mut [f64]| factory.d_psi(u, xi, grad);

    let problem = AlmProblem::new(
        Rectangle::new(Some(seed.lower), Some(seed.upper)),
        Some(Zero::new()),
        Some(BallInf::new(None, config.max_multiplier)),
        psi,
        d_psi,
        Some(f1),
        NO_MAPPING,
        m,
        0,
    );
    let mut cache = AlmCache::new(PANOCCache::new(n, config.tol, config.lbfgs_memory), m, 0);
    let mut optimizer = AlmOptimizer::new(&mut cache, problem)
        .with_delta_tolerance(config.constraint_tol)
        .with_epsilon_tolerance(config.tol)
        .with_initial_inner_tolerance(seed.inner_tolerance)
        .with_inner_tolerance_update_factor(config.inner_tolerance_update_factor)
        .with_max_outer_iterations(config.max_outer_iterations)
        .with_max_inner_iterations(config.max_inner_iterations)
        .with_initial_penalty(seed.penalty)
        .with_penalty_update_factor(config.penalty_update_factor)
        .with_sufficient_decrease_coefficient(config.sufficient_decrease)
        .with_initial_lagrange_multipliers(seed.multipliers);

    let status = optimizer.solve(z)?;
    Ok(EngineRun {
        exit: status.exit_status(),
        outer: status.num_outer_iterations(),
        inner: status.num_inner_iterations(),
        multipliers: status.lagrange_multipliers().clone(),
        penalty: status.penalty(),
    })
}

fn run_quadratic_penalty<P: NlpProblem>(
    callbacks: &Callbacks<'_, P>,
    z: &mut [f64],
    seed: &Seed<'_>,
    config: &AlmConfig,
) -> Result<EngineRun, EngineError> {
    let n = z.len();
    let m = seed.multipliers.len();
    let f = |u: &[f64], cost: &mut f64| callbacks.cost(u, cost);
    let df = |u: &[f64], grad: &mut [f64]| callbacks.gradient(u, grad);
    let f2 = |u: &[f64], res: &mut [f64]| callbacks.constraints(u, res);
    let jf2_tr = |u: &[f64], d: &[f64], res: &mut [f64]| callbacks.jacobian_tr(u, d, res);

    let factory = AlmFactory::new(
        f,
        df,
        NO_MAPPING,
        NO_JACOBIAN_MAPPING,
        Some(f2),
        Some(jf2_tr),
        NO_SET,
        m,
    );
    let psi = |u: &[f64], xi: &[f64], cost: &mut f64| factory.psi(u, xi, cost);
    let d_psi = |u: &[f64], xi: &[f64], grad: &mut [f64]| factory.d_psi(u, xi, grad);

    let problem = AlmProblem::new(
        Rectangle::new(Some(seed.lower), Some(seed.upper)),
        NO_SET,
        NO_SET,
        psi,
        d_psi,
        NO_MAPPING,
        Some(f2),
        0,
        m,
    );
    let mut cache = AlmCache::new(PANOCCache::new(n, config.tol, config.lbfgs_memory), 0, m);
    let mut optimizer = AlmOptimizer::new(&mut cache, problem)
        .with_delta_tolerance(config.constraint_tol)
        .with_epsilon_tolerance(config.tol)
        .with_initial_inner_tolerance(seed.inner_tolerance)
        .with_inner_tolerance_update_factor(config.inner_tolerance_update_factor)
        .with_max_outer_iterations(config.max_outer_iterations)
        .with_max_inner_iterations(config.max_inner_iterations)
        .with_initial_penalty(seed.penalty)
        .with_penalty_update_factor(config.penalty_update_factor)
        .with_sufficient_decrease_coefficient(config.sufficient_decrease);

    let status = optimizer.solve(z)?;
    Ok(EngineRun {
        exit: status.exit_status(),
        outer: status.num_outer_iterations(),
        inner: status.num_inner_iterations(),
        multipliers: None,
        penalty: status.penalty(),
    })
}

fn check_bounds(lower: &[f64], upper: &[f64], n: usize) -> SolverResult<()> {
    if lower.len() != n || upper.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "bounds have lengths {}/{}, expected {n}",
                lower.len(),
                upper.len()
            ),
        });
    }
    for (k, (lo, hi)) in lower.iter().zip(upper).enumerate() {
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(SolverError::ProblemSetup {
                what: format!("bounds of variable {k} are inconsistent: [{lo}, {hi}]"),
            });
        }
    }
    Ok(())
}

/// Solve `problem` from `z0`, optionally seeded with dual information of a
/// previous solve.
///
/// A run that stops on an iteration limit is reported as
/// [`SolverError::ConvergenceFailed`]; errors raised while evaluating the
/// problem are passed through unchanged.
pub fn solve<P: NlpProblem>(
    problem: &P,
    z0: &[f64],
    warm: &WarmStart,
    config: &AlmConfig,
) -> SolverResult<NlpSolution> {
    config.validate()?;
    let n = problem.num_variables();
    let m = problem.num_constraints();
    ensure_len(z0.len(), n, "initial guess")?;
    ensure_all_finite(z0, "initial guess")?;
    let lower = problem.lower_bounds();
    let upper = problem.upper_bounds();
    check_bounds(&lower, &upper, n)?;

    // PANOC iterates stay inside the box, so start there too.
    let mut z: Vec<f64> = z0
        .iter()
        .zip(lower.iter().zip(&upper))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
        .collect();

    let radius = config.max_multiplier;
    let multipliers: Vec<f64> = match &warm.multipliers {
        Some(y) if y.len() == m => y
            .iter()
            .map(|v| if v.is_finite() { v.clamp(-radius, radius) } else { 0.0 })
            .collect(),
        _ => vec![0.0; m],
    };
    let penalty = warm
        .penalty
        .filter(|c| c.is_finite() && *c >= config.initial_penalty)
        .unwrap_or(config.initial_penalty);
    // Seeded multipliers are already converged: skip the loose subproblems.
    let inner_tolerance = match warm.multipliers {
        Some(_) => config.tol,
        None => config.initial_inner_tolerance.max(config.tol),
    };
    let seed = Seed {
        lower: &lower,
        upper: &upper,
        multipliers: &multipliers,
        penalty,
        inner_tolerance,
    };
    trace!(
        variables = n,
        constraints = m,
        method = ?config.method,
        penalty,
        warm = warm.multipliers.is_some(),
        "starting NLP solve"
    );

    let callbacks = Callbacks::new(problem);
    let run = match config.method {
        Method::AugmentedLagrangian => run_augmented_lagrangian(&callbacks, &mut z, &seed, config),
        Method::QuadraticPenalty => run_quadratic_penalty(&callbacks, &mut z, &seed, config),
    }
    .map_err(|err| callbacks.error(err))?;

    if !matches!(run.exit, ExitStatus::Converged) {
        return Err(SolverError::ConvergenceFailed {
            what: format!(
                "{:?} after {} outer / {} inner iterations",
                run.exit, run.outer, run.inner
            ),
        });
    }

    let mut residual = vec![0.0; m];
    problem.constraints(&z, &mut residual)?;
    let infeasibility = residual.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
    let objective = problem.objective(&z)?;
    let multipliers = match config.method {
        Method::AugmentedLagrangian => run.multipliers.unwrap_or(multipliers),
        Method::QuadraticPenalty => residual.iter().map(|c| run.penalty * c).collect(),
    };
    debug!(
        outer = run.outer,
        inner = run.inner,
        objective,
        infeasibility,
        penalty = run.penalty,
        "NLP converged"
    );

    Ok(NlpSolution {
        z,
        multipliers,
        penalty: run.penalty,
        objective,
        outer_iterations: run.outer,
        inner_iterations: run.inner,
        infeasibility,
    })
}
