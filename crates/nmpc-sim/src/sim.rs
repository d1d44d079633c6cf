//! Plant simulator and open-loop runs.

use nmpc_core::ensure_all_finite;
use tracing::trace;

use crate::error::{SimError, SimResult};
use crate::integrator::{Integrator, IntegratorType};
use crate::model::DynamicsModel;

/// Simulation timing: start, end and sample period (seconds, or the
/// model's time unit).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    pub t0: f64,
    pub tf: f64,
    pub dt: f64,
}

impl SimParams {
    pub fn new(t0: f64, tf: f64, dt: f64) -> SimResult<Self> {
        if !t0.is_finite() || !tf.is_finite() {
            return Err(SimError::InvalidArg {
                what: "t0 and tf must be finite",
            });
        }
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if tf <= t0 {
            return Err(SimError::InvalidArg {
                what: "tf must be greater than t0",
            });
        }
        Ok(Self { t0, tf, dt })
    }

    /// Number of whole samples in `[t0, tf]`: `floor((tf - t0) / dt)`.
    ///
    /// The quotient gets a 1e-9 allowance so that e.g. `10.0 / 0.05`
    /// counts 200 samples regardless of float representation.
    pub fn num_steps(&self) -> usize {
        ((self.tf - self.t0) / self.dt + 1e-9).floor() as usize
    }

    /// Time of sample `k`.
    pub fn time_at(&self, k: usize) -> f64 {
        self.t0 + k as f64 * self.dt
    }
}

/// Advances the (possibly different, "true") plant model by one sample.
///
/// Holds only the immutable model, the integrator and the timing.
#[derive(Clone, Debug)]
pub struct Simulator<M: DynamicsModel> {
    model: M,
    integrator: IntegratorType,
    params: SimParams,
}

impl<M: DynamicsModel> Simulator<M> {
    pub fn new(model: M, integrator: IntegratorType, params: SimParams) -> Self {
        Self {
            model,
            integrator,
            params,
        }
    }

    /// Apply `u` over one sample period starting from `x`.
    pub fn apply_control_for_time_step(&self, x: &[f64], u: &[f64]) -> SimResult<Vec<f64>> {
        ensure_all_finite(u, "control input")?;
        let x_next = self.integrator.step(&self.model, self.params.dt, x, u)?;
        ensure_all_finite(&x_next, "simulated state")?;
        trace!(?x_next, "plant step");
        Ok(x_next)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn integrator(&self) -> IntegratorType {
        self.integrator
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn t0(&self) -> f64 {
        self.params.t0
    }

    pub fn tf(&self) -> f64 {
        self.params.tf
    }

    pub fn dt(&self) -> f64 {
        self.params.dt
    }
}
