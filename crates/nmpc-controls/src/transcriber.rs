//! Direct multiple shooting transcription.
//!
//! The decision vector interleaves stages as
//! `[X_0, U_0, X_1, U_1, ..., X_{N-1}, U_{N-1}, X_N]`, all in scaled units.
//! Constraints are the initial condition `X_0 - p = 0` followed by one
//! block of `nx` defects per interval:
//!
//! ```text
//! X_{i+1} - sc_x * F(X_i / sc_x, U_i / sc_u) = 0
//! ```
//!
//! where `F` is one integrator step of the model. The solver only needs the
//! transposed Jacobian product `J^T d`, which is accumulated stage by stage
//! from forward-mode dual evaluations of `F` without storing `J`.

use std::fmt;

use nalgebra::DMatrix;
use nmpc_core::Dual64;
use nmpc_sim::{DynamicsModel, Integrator, IntegratorType, SimError};
use nmpc_solver::{AlmConfig, NlpProblem, SolverError, SolverResult, WarmStart};
use tracing::{debug, info};

use crate::config::{OcpConfig, WarmStartStrategy};
use crate::error::{ControlError, ControlResult};

/// PANOC iteration limit per subproblem.
const MAX_INNER_ITERATIONS: usize = 5000;

/// Session phase. `solve` is legal in `AwaitingSolve`, `init` in `Solved`,
/// `recover` in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingSolve,
    Solved,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::AwaitingSolve => write!(f, "AwaitingSolve"),
            Phase::Solved => write!(f, "Solved"),
            Phase::Failed => write!(f, "Failed"),
        }
    }
}

/// Offsets of stage variables and defect rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLayout {
    pub nx: usize,
    pub nu: usize,
    pub n_shoot: usize,
}

impl StageLayout {
    pub fn num_variables(&self) -> usize {
        self.n_shoot * (self.nx + self.nu) + self.nx
    }

    pub fn num_constraints(&self) -> usize {
        self.nx * (self.n_shoot + 1)
    }

    pub fn x_offset(&self, stage: usize) -> usize {
        stage * (self.nx + self.nu)
    }

    pub fn u_offset(&self, stage: usize) -> usize {
        stage * (self.nx + self.nu) + self.nx
    }

    /// First row of the defect block of interval `i`.
    pub fn defect_row(&self, i: usize) -> usize {
        self.nx * (i + 1)
    }
}

/// Unscaled optimal trajectories.
#[derive(Debug, Clone)]
pub struct OcpSolution {
    /// Controls, `nu x n_shoot`
    pub u: DMatrix<f64>,
    /// States, `nx x (n_shoot + 1)`
    pub x: DMatrix<f64>,
    pub cost: f64,
    /// PANOC iterations summed over all subproblems
    pub iterations: usize,
    pub outer_iterations: usize,
}

impl OcpSolution {
    /// Control to apply over the current sample.
    pub fn first_control(&self) -> Vec<f64> {
        self.u.column(0).iter().copied().collect()
    }
}

fn evaluation(err: SimError) -> SolverError {
    SolverError::Evaluation {
        what: err.to_string(),
    }
}

fn unscale(values: &[f64], scale: &[f64]) -> Vec<f64> {
    values.iter().zip(scale).map(|(v, s)| v / s).collect()
}

/// Move every entry `by` places towards the front; the tail keeps its values.
fn shift_left(values: &mut [f64], by: usize) {
    let n = values.len();
    if by < n {
        values.copy_within(by.., 0);
    }
}

/// A multiple shooting NLP built once and re-solved every control cycle.
///
/// Owns the warm-start cache (primal guess plus multipliers and penalty)
/// and the initial-condition parameter; one session must not be shared
/// between control loops.
#[derive(Debug, Clone)]
pub struct OcpSession<M: DynamicsModel> {
    config: OcpConfig,
    model: M,
    integrator: IntegratorType,
    layout: StageLayout,
    lower: Vec<f64>,
    upper: Vec<f64>,
    // Per decision variable: scale, cost weight and target in physical units.
    scale: Vec<f64>,
    weight: Vec<f64>,
    target: Vec<f64>,
    initial_condition: Vec<f64>,
    guess: Vec<f64>,
    dual_guess: WarmStart,
    last_plan: Option<OcpSolution>,
    phase: Phase,
    solver: AlmConfig,
}

impl<M: DynamicsModel> OcpSession<M> {
    /// Validate the configuration and build the NLP.
    pub fn new(config: OcpConfig, model: M, integrator: IntegratorType) -> ControlResult<Self> {
        config.validate()?;
        if model.nx() != config.nx {
            return Err(ControlError::Dimension {
                what: "model state count",
                expected: config.nx,
                got: model.nx(),
            });
        }
        if model.nu() != config.nu {
            return Err(ControlError::Dimension {
                what: "model control count",
                expected: config.nu,
                got: model.nu(),
            });
        }

        let layout = StageLayout {
            nx: config.nx,
            nu: config.nu,
            n_shoot: config.n_shoot,
        };
        let n = layout.num_variables();
        let mut scale = vec![1.0; n];
        let mut weight = vec![0.0; n];
        let mut target = vec![0.0; n];
        let mut lower = vec![f64::NEG_INFINITY; n];
        let mut upper = vec![f64::INFINITY; n];

        for stage in 0..=layout.n_shoot {
            let xo = layout.x_offset(stage);
            for j in 0..layout.nx {
                scale[xo + j] = config.sc_x[j];
            }
            // X_0 is pinned by the initial condition and carries no cost.
            if stage > 0 {
                for (k, &j) in config.x_con.index.iter().enumerate() {
                    lower[xo + j] = config.sc_x[j] * config.x_con.min[k];
                    upper[xo + j] = config.sc_x[j] * config.x_con.max[k];
                }
                for (k, &j) in config.x_e_index.iter().enumerate() {
                    weight[xo + j] = config.q[k];
                    if stage == layout.n_shoot {
                        weight[xo + j] += config.p[k];
                    }
                    target[xo + j] = config.x_e[j];
                }
            }
            if stage < layout.n_shoot {
                let uo = layout.u_offset(stage);
                for j in 0..layout.nu {
                    scale[uo + j] = config.sc_u[j];
                    weight[uo + j] = config.r[j];
                }
                for (k, &j) in config.u_con.index.iter().enumerate() {
                    lower[uo + j] = config.sc_u[j] * config.u_con.min[k];
                    upper[uo + j] = config.sc_u[j] * config.u_con.max[k];
                }
            }
        }

        let solver = AlmConfig {
            method: config.solver.method(),
            tol: config.tol,
            constraint_tol: config.tol,
            max_outer_iterations: config.max_iter,
            max_inner_iterations: MAX_INNER_ITERATIONS,
            ..AlmConfig::default()
        };
        let initial_condition: Vec<f64> =
            config.x_0.iter().zip(&config.sc_x).map(|(x, s)| s * x).collect();

        let mut session = Self {
            config,
            model,
            integrator,
            layout,
            lower,
            upper,
            scale,
            weight,
            target,
            initial_condition,
            guess: vec![0.0; n],
            dual_guess: WarmStart::default(),
            last_plan: None,
            phase: Phase::AwaitingSolve,
            solver,
        };
        session.guess = session.cold_start();
        debug!(
            variables = n,
            constraints = layout.num_constraints(),
            integrator = %integrator,
            solver = %session.config.solver,
            "multiple shooting NLP built"
        );
        Ok(session)
    }

    /// Scaled initial state repeated over the horizon, controls at the
    /// middle of their bounds (zero where unbounded).
    pub fn cold_start(&self) -> Vec<f64> {
        let layout = self.layout;
        let mut z = vec![0.0; layout.num_variables()];
        for stage in 0..=layout.n_shoot {
            let xo = layout.x_offset(stage);
            for j in 0..layout.nx {
                z[xo + j] = self.initial_condition[j];
            }
        }
        let con = &self.config.u_con;
        for stage in 0..layout.n_shoot {
            let uo = layout.u_offset(stage);
            for (k, &j) in con.index.iter().enumerate() {
                z[uo + j] = self.config.sc_u[j] * 0.5 * (con.min[k] + con.max[k]);
            }
        }
        z
    }

    /// Solve the NLP from the current warm start.
    ///
    /// On success the solution, its multipliers and the final penalty become
    /// the next warm start. On failure the session enters [`Phase::Failed`]
    /// and the solver error is returned; the warm start is left untouched.
    pub fn solve(&mut self) -> ControlResult<OcpSolution> {
        self.expect_phase(Phase::AwaitingSolve)?;
        match nmpc_solver::solve(&*self, &self.guess, &self.dual_guess, &self.solver) {
            Ok(sol) => {
                let mut plan = self.unpack(&sol.z, sol.objective, sol.inner_iterations);
                plan.outer_iterations = sol.outer_iterations;
                info!(
                    iterations = sol.inner_iterations,
                    outer = sol.outer_iterations,
                    cost = sol.objective,
                    infeasibility = sol.infeasibility,
                    "OCP solved"
                );
                self.dual_guess = sol.warm_start();
                self.guess = sol.z;
                self.last_plan = Some(plan.clone());
                self.phase = Phase::Solved;
                Ok(plan)
            }
            Err(err) => {
                self.phase = Phase::Failed;
                Err(ControlError::Solver(err))
            }
        }
    }

    /// Bind a new measured state and prepare the warm start for the next
    /// solve. Constraints and cost are not rebuilt.
    pub fn init(&mut self, x_measured: &[f64]) -> ControlResult<()> {
        self.expect_phase(Phase::Solved)?;
        if x_measured.len() != self.layout.nx {
            return Err(ControlError::Dimension {
                what: "measured state",
                expected: self.layout.nx,
                got: x_measured.len(),
            });
        }
        if x_measured.iter().any(|v| !v.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "measured state must be finite",
            });
        }
        for (j, &x) in x_measured.iter().enumerate() {
            self.initial_condition[j] = self.config.sc_x[j] * x;
        }
        if self.config.warm_start == WarmStartStrategy::Shift {
            // X_N and U_{N-1} keep their values and end up duplicated, as do
            // the multipliers of the last defect block.
            shift_left(&mut self.guess, self.layout.nx + self.layout.nu);
            if let Some(y) = self.dual_guess.multipliers.as_mut() {
                shift_left(y, self.layout.nx);
            }
        }
        self.phase = Phase::AwaitingSolve;
        Ok(())
    }

    /// Leave the failed phase holding the last successful plan (or the cold
    /// start plan if none exists yet).
    pub fn recover(&mut self) -> ControlResult<OcpSolution> {
        self.expect_phase(Phase::Failed)?;
        let plan = match &self.last_plan {
            Some(plan) => plan.clone(),
            None => {
                let cold = self.cold_start();
                let cost = self.objective(&cold)?;
                self.unpack(&cold, cost, 0)
            }
        };
        self.phase = Phase::Solved;
        Ok(plan)
    }

    fn expect_phase(&self, expected: Phase) -> ControlResult<()> {
        if self.phase != expected {
            return Err(ControlError::Ordering {
                expected,
                found: self.phase,
            });
        }
        Ok(())
    }

    fn unpack(&self, z: &[f64], cost: f64, iterations: usize) -> OcpSolution {
        let layout = self.layout;
        let x = DMatrix::from_fn(layout.nx, layout.n_shoot + 1, |j, i| {
            z[layout.x_offset(i) + j] / self.config.sc_x[j]
        });
        let u = DMatrix::from_fn(layout.nu, layout.n_shoot, |j, i| {
            z[layout.u_offset(i) + j] / self.config.sc_u[j]
        });
        OcpSolution {
            u,
            x,
            cost,
            iterations,
            outer_iterations: 0,
        }
    }

    /// One integrator step of the controller model in physical units.
    fn propagate(&self, x: &[f64], u: &[f64]) -> ControlResult<Vec<f64>> {
        Ok(self.integrator.step(&self.model, self.config.dt, x, u)?)
    }

    /// Largest defect `|x_{i+1} - F(x_i, u_i)|` of a plan, in physical units.
    pub fn max_defect(&self, plan: &OcpSolution) -> ControlResult<f64> {
        let mut worst: f64 = 0.0;
        for i in 0..self.layout.n_shoot {
            let x: Vec<f64> = plan.x.column(i).iter().copied().collect();
            let u: Vec<f64> = plan.u.column(i).iter().copied().collect();
            let predicted = self.propagate(&x, &u)?;
            for (j, p) in predicted.iter().enumerate() {
                worst = worst.max((plan.x[(j, i + 1)] - p).abs());
            }
        }
        Ok(worst)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &OcpConfig {
        &self.config
    }

    pub fn layout(&self) -> StageLayout {
        self.layout
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Scaled constraint residual `c(z)`: initial condition rows followed by
    /// the defect blocks.
    pub fn constraint_residual(&self, z: &[f64]) -> ControlResult<Vec<f64>> {
        let mut c = vec![0.0; self.layout.num_constraints()];
        self.constraints(z, &mut c)?;
        Ok(c)
    }

    /// Current initial-condition parameter in physical units.
    pub fn initial_state(&self) -> Vec<f64> {
        unscale(&self.initial_condition, &self.config.sc_x)
    }

    /// Scaled initial guess for the next solve.
    pub fn warm_start(&self) -> &[f64] {
        &self.guess
    }

    /// Multipliers and penalty handed to the next solve.
    pub fn dual_warm_start(&self) -> &WarmStart {
        &self.dual_guess
    }

    pub fn last_plan(&self) -> Option<&OcpSolution> {
        self.last_plan.as_ref()
    }

    fn stage_inputs(&self, z: &[f64], i: usize) -> (Vec<f64>, Vec<f64>) {
        let xo = self.layout.x_offset(i);
        let uo = self.layout.u_offset(i);
        (
            unscale(&z[xo..xo + self.layout.nx], &self.config.sc_x),
            unscale(&z[uo..uo + self.layout.nu], &self.config.sc_u),
        )
    }

    /// Integrator step over dual numbers with stage input `k` seeded.
    ///
    /// Inputs `0..nx` are the states, `nx..nx + nu` the controls. Seeding
    /// with `1/sc` applies the chain rule of the unscaling, so `eps` holds
    /// the derivative with respect to the scaled decision variable.
    fn seeded_step(&self, x: &[f64], u: &[f64], k: usize) -> SolverResult<Vec<Dual64>> {
        let nx = self.layout.nx;
        let seed = |idx: usize, v: f64, sc: f64| {
            Dual64::new(v, if idx == k { 1.0 / sc } else { 0.0 })
        };
        let xd: Vec<Dual64> = x
            .iter()
            .zip(&self.config.sc_x)
            .enumerate()
            .map(|(j, (&v, &sc))| seed(j, v, sc))
            .collect();
        let ud: Vec<Dual64> = u
            .iter()
            .zip(&self.config.sc_u)
            .enumerate()
            .map(|(j, (&v, &sc))| seed(nx + j, v, sc))
            .collect();
        self.integrator
            .step(&self.model, self.config.dt, &xd, &ud)
            .map_err(evaluation)
    }
}

impl<M: DynamicsModel> NlpProblem for OcpSession<M> {
    fn num_variables(&self) -> usize {
        self.layout.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.layout.num_constraints()
    }

    fn lower_bounds(&self) -> Vec<f64> {
        self.lower.clone()
    }

    fn upper_bounds(&self) -> Vec<f64> {
        self.upper.clone()
    }

    fn objective(&self, z: &[f64]) -> SolverResult<f64> {
        let mut cost = 0.0;
        for (k, &v) in z.iter().enumerate() {
            if self.weight[k] != 0.0 {
                let e = v / self.scale[k] - self.target[k];
                cost += self.weight[k] * e * e;
            }
        }
        Ok(cost)
    }

    fn gradient(&self, z: &[f64], grad: &mut [f64]) -> SolverResult<()> {
        for (k, (g, &v)) in grad.iter_mut().zip(z).enumerate() {
            *g = 2.0 * self.weight[k] * (v / self.scale[k] - self.target[k]) / self.scale[k];
        }
        Ok(())
    }

    fn constraints(&self, z: &[f64], c: &mut [f64]) -> SolverResult<()> {
        let layout = self.layout;
        let sc_x = &self.config.sc_x;
        for j in 0..layout.nx {
            c[j] = z[j] - self.initial_condition[j];
        }
        for i in 0..layout.n_shoot {
            let (x, u) = self.stage_inputs(z, i);
            let x_next = self
                .integrator
                .step(&self.model, self.config.dt, &x, &u)
                .map_err(evaluation)?;
            let row = layout.defect_row(i);
            let xo = layout.x_offset(i + 1);
            for j in 0..layout.nx {
                c[row + j] = z[xo + j] - sc_x[j] * x_next[j];
            }
        }
        Ok(())
    }

    /// `J^T d` by forward-mode dual numbers, one seed per stage input.
    fn constraints_jacobian_tr_mul(
        &self,
        z: &[f64],
        d: &[f64],
        out: &mut [f64],
    ) -> SolverResult<()> {
        let layout = self.layout;
        let (nx, nu) = (layout.nx, layout.nu);
        let sc_x = &self.config.sc_x;

        out.fill(0.0);
        // Initial condition rows are the identity on X_0.
        out[..nx].copy_from_slice(&d[..nx]);

        for i in 0..layout.n_shoot {
            let (x, u) = self.stage_inputs(z, i);
            let row = layout.defect_row(i);
            let d_i = &d[row..row + nx];
            // U_i directly follows X_i, so input k sits at column x_offset(i) + k.
            let col0 = layout.x_offset(i);
            for k in 0..(nx + nu) {
                let step = self.seeded_step(&x, &u, k)?;
                let dot: f64 = (0..nx).map(|j| sc_x[j] * step[j].eps * d_i[j]).sum();
                out[col0 + k] -= dot;
            }
            let next = layout.x_offset(i + 1);
            for j in 0..nx {
                out[next + j] += d_i[j];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverKind;
    use crate::config::tests::sample_config;
    use nmpc_core::Scalar;
    use nmpc_sim::{DipcModel, DipcParams, SimResult};

    /// `x = [position, velocity]`, `u = [acceleration]`.
    #[derive(Debug)]
    struct DoubleIntegrator;

    impl DynamicsModel for DoubleIntegrator {
        fn nx(&self) -> usize {
            2
        }

        fn nu(&self) -> usize {
            1
        }

        fn derivative<S: Scalar>(&self, x: &[S], u: &[S]) -> SimResult<Vec<S>> {
            self.check_dims(x, u)?;
            Ok(vec![x[1], u[0]])
        }
    }

    fn session() -> OcpSession<DoubleIntegrator> {
        OcpSession::new(sample_config(), DoubleIntegrator, IntegratorType::RK4).unwrap()
    }

    /// Cart-pendulum session with non-trivial scaling and a perturbed point.
    fn dipc_session_and_point() -> (OcpSession<DipcModel>, Vec<f64>) {
        let mut cfg = OcpConfig {
            nx: 6,
            nu: 1,
            x_0: vec![0.0, 0.1, 0.1, 0.0, 0.0, 0.0],
            x_e: vec![0.0; 6],
            x_e_index: vec![0, 1, 2],
            q: vec![1.0; 3],
            p: vec![1.0; 3],
            sc_x: vec![1.0, 2.0, 2.0, 0.5, 0.5, 0.5],
            sc_u: vec![0.1],
            n_shoot: 4,
            dt: 0.05,
            ..sample_config()
        };
        cfg.x_con.index = vec![0];
        let model = DipcModel::new(DipcParams::reference()).unwrap();
        let s = OcpSession::new(cfg, model, IntegratorType::RK4).unwrap();

        let mut z = s.warm_start().to_vec();
        for (k, v) in z.iter_mut().enumerate() {
            *v += 0.01 * ((k * 37 % 11) as f64 - 5.0);
        }
        (s, z)
    }

    #[test]
    fn layout_offsets() {
        let layout = StageLayout {
            nx: 6,
            nu: 1,
            n_shoot: 20,
        };
        assert_eq!(layout.num_variables(), 20 * 7 + 6);
        assert_eq!(layout.num_constraints(), 6 * 21);
        assert_eq!(layout.x_offset(3), 21);
        assert_eq!(layout.u_offset(3), 27);
        assert_eq!(layout.defect_row(0), 6);
    }

    #[test]
    fn cold_start_repeats_initial_state() {
        let mut cfg = sample_config();
        cfg.sc_x = vec![2.0, 1.0];
        cfg.u_con.min = vec![-1.0];
        cfg.u_con.max = vec![3.0];
        let s = OcpSession::new(cfg, DoubleIntegrator, IntegratorType::RK4).unwrap();
        let z = s.warm_start();
        let layout = s.layout();
        for stage in 0..=layout.n_shoot {
            assert_eq!(z[layout.x_offset(stage)], 2.0);
            assert_eq!(z[layout.x_offset(stage) + 1], 0.0);
        }
        for stage in 0..layout.n_shoot {
            assert_eq!(z[layout.u_offset(stage)], 1.0);
        }
        assert_eq!(s.dual_warm_start(), &WarmStart::default());
    }

    #[test]
    fn bounds_skip_initial_stage() {
        let s = session();
        let lb = s.lower_bounds();
        let layout = s.layout();
        assert!(lb[layout.x_offset(0) + 1].is_infinite());
        assert_eq!(lb[layout.x_offset(1) + 1], -1.0);
        assert!(lb[layout.x_offset(1)].is_infinite());
        assert_eq!(lb[layout.u_offset(0)], -2.0);
    }

    #[test]
    fn terminal_weight_added_to_last_stage() {
        // Cold start sits at x = (1, 0) with target 0: d/dx0 (w x0^2) = 2 w.
        let s = session();
        let layout = s.layout();
        let mut grad = vec![0.0; layout.num_variables()];
        s.gradient(s.warm_start(), &mut grad).unwrap();
        assert_eq!(grad[layout.x_offset(0)], 0.0);
        assert_eq!(grad[layout.x_offset(1)], 2.0);
        assert_eq!(grad[layout.x_offset(layout.n_shoot)], 22.0);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (s, z) = dipc_session_and_point();
        let mut grad = vec![0.0; z.len()];
        s.gradient(&z, &mut grad).unwrap();
        let h = 1e-6;
        for k in 0..z.len() {
            let mut zp = z.clone();
            let mut zm = z.clone();
            zp[k] += h;
            zm[k] -= h;
            let fd = (s.objective(&zp).unwrap() - s.objective(&zm).unwrap()) / (2.0 * h);
            assert!((grad[k] - fd).abs() < 1e-5 * (1.0 + fd.abs()), "k = {k}");
        }
    }

    #[test]
    fn dual_jacobian_transpose_matches_finite_differences() {
        let (s, z) = dipc_session_and_point();
        let m = s.num_constraints();
        let d: Vec<f64> = (0..m).map(|r| ((r * 13 % 7) as f64 - 3.0) * 0.25).collect();

        let mut jt_d = vec![0.0; z.len()];
        s.constraints_jacobian_tr_mul(&z, &d, &mut jt_d).unwrap();

        // d^T c(z) differentiated numerically, one variable at a time.
        let weighted = |v: &[f64]| -> f64 {
            let c = s.constraint_residual(v).unwrap();
            c.iter().zip(&d).map(|(ci, di)| ci * di).sum()
        };
        let h = 1e-6;
        for k in 0..z.len() {
            let mut zp = z.clone();
            let mut zm = z.clone();
            zp[k] += h;
            zm[k] -= h;
            let fd = (weighted(&zp) - weighted(&zm)) / (2.0 * h);
            assert!(
                (jt_d[k] - fd).abs() < 1e-5 * (1.0 + fd.abs()),
                "column {k}: {} vs {fd}",
                jt_d[k]
            );
        }
    }

    #[test]
    fn solution_is_feasible_in_scaled_units() {
        let mut s = session();
        s.solve().unwrap();
        let residual = s.constraint_residual(s.warm_start()).unwrap();
        let worst = residual.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!(worst < 1e-5, "max residual {worst}");
    }

    #[test]
    fn penalty_backend_solves_too() {
        let mut cfg = sample_config();
        cfg.solver = SolverKind::Penalty;
        // The penalty must grow like 1/tol, keep the problem well conditioned.
        cfg.tol = 1e-4;
        let mut s = OcpSession::new(cfg, DoubleIntegrator, IntegratorType::RK4).unwrap();
        let penalty = s.solve().unwrap();
        let alm = session().solve().unwrap();
        assert!(s.max_defect(&penalty).unwrap() < 1e-3);
        assert!((penalty.cost - alm.cost).abs() < 1e-2 * (1.0 + alm.cost));
    }

    #[test]
    fn init_before_solve_is_ordering_error() {
        let mut s = session();
        let err = s.init(&[0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            ControlError::Ordering {
                expected: Phase::Solved,
                found: Phase::AwaitingSolve
            }
        ));
    }

    #[test]
    fn double_solve_is_ordering_error() {
        let mut s = session();
        s.solve().unwrap();
        assert_eq!(s.phase(), Phase::Solved);
        assert!(matches!(
            s.solve(),
            Err(ControlError::Ordering {
                expected: Phase::AwaitingSolve,
                ..
            })
        ));
        assert!(s.recover().is_err());
    }

    #[test]
    fn failed_solve_requires_recover() {
        let mut cfg = sample_config();
        cfg.max_iter = 1;
        let mut s = OcpSession::new(cfg, DoubleIntegrator, IntegratorType::RK4).unwrap();
        assert!(matches!(s.solve(), Err(ControlError::Solver(_))));
        assert_eq!(s.phase(), Phase::Failed);
        assert!(s.init(&[1.0, 0.0]).is_err());
        // A failed solve leaves no dual information behind.
        assert!(s.dual_warm_start().multipliers.is_none());

        let plan = s.recover().unwrap();
        assert_eq!(s.phase(), Phase::Solved);
        // No previous solution: the cold start plan uses the control midpoint.
        assert_eq!(plan.first_control(), vec![0.0]);
        s.init(&[1.0, 0.0]).unwrap();
        assert_eq!(s.phase(), Phase::AwaitingSolve);
    }

    #[test]
    fn init_rejects_wrong_dimension() {
        let mut s = session();
        s.solve().unwrap();
        assert!(matches!(
            s.init(&[0.0]),
            Err(ControlError::Dimension { .. })
        ));
        assert_eq!(s.phase(), Phase::Solved);
    }

    #[test]
    fn shift_drops_first_stage() {
        let mut cfg = sample_config();
        cfg.warm_start = WarmStartStrategy::Shift;
        let mut s = OcpSession::new(cfg, DoubleIntegrator, IntegratorType::RK4).unwrap();
        let plan = s.solve().unwrap();
        let y_before = s.dual_warm_start().multipliers.clone().unwrap();
        s.init(&[0.5, 0.0]).unwrap();

        let layout = s.layout();
        let z = s.warm_start();
        let n = layout.n_shoot;
        assert!((z[layout.x_offset(0)] - plan.x[(0, 1)]).abs() < 1e-12);
        assert!((z[layout.u_offset(0)] - plan.u[(0, 1)]).abs() < 1e-12);
        assert!((z[layout.x_offset(n)] - plan.x[(0, n)]).abs() < 1e-12);
        assert!((z[layout.x_offset(n - 1)] - plan.x[(0, n)]).abs() < 1e-12);
        assert!((z[layout.u_offset(n - 1)] - plan.u[(0, n - 1)]).abs() < 1e-12);
        assert_eq!(s.initial_state(), vec![0.5, 0.0]);

        let y = s.dual_warm_start().multipliers.as_ref().unwrap();
        let nx = layout.nx;
        assert_eq!(&y[..y.len() - nx], &y_before[nx..]);
        assert_eq!(&y[y.len() - nx..], &y_before[y.len() - nx..]);
    }

    #[test]
    fn reuse_keeps_previous_solution() {
        let mut s = session();
        s.solve().unwrap();
        let before = s.warm_start().to_vec();
        let dual_before = s.dual_warm_start().clone();
        assert!(dual_before.penalty.is_some());
        s.init(&[0.5, 0.0]).unwrap();
        assert_eq!(s.warm_start(), before.as_slice());
        assert_eq!(s.dual_warm_start(), &dual_before);
    }

    #[test]
    fn model_dimension_mismatch() {
        let mut cfg = sample_config();
        cfg.nx = 3;
        cfg.x_0 = vec![0.0; 3];
        cfg.x_e = vec![0.0; 3];
        cfg.sc_x = vec![1.0; 3];
        let err = OcpSession::new(cfg, DoubleIntegrator, IntegratorType::RK4).unwrap_err();
        assert!(matches!(err, ControlError::Dimension { .. }));
    }

    #[test]
    fn shift_left_duplicates_tail() {
        let mut v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        shift_left(&mut v, 2);
        assert_eq!(v, vec![3.0, 4.0, 5.0, 4.0, 5.0]);
        let mut w = vec![1.0];
        shift_left(&mut w, 3);
        assert_eq!(w, vec![1.0]);
    }
}
