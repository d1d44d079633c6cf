//! Receding-horizon controller on top of an [`OcpSession`].

use std::fmt;
use std::str::FromStr;

use nmpc_sim::{DynamicsModel, IntegratorType};
use serde::{Deserialize, Serialize};

use crate::config::OcpConfig;
use crate::error::{ControlError, ControlResult};
use crate::transcriber::{OcpSession, OcpSolution};

/// What the control loop does when a solve fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryPolicy {
    /// Propagate the solver error and stop the run.
    #[default]
    Abort,
    /// Apply the last valid control (cold-start control on the first cycle).
    HoldLast,
}

impl fmt::Display for RecoveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryPolicy::Abort => write!(f, "abort"),
            RecoveryPolicy::HoldLast => write!(f, "hold-last"),
        }
    }
}

impl FromStr for RecoveryPolicy {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(RecoveryPolicy::Abort),
            "hold-last" | "hold_last" => Ok(RecoveryPolicy::HoldLast),
            _ => Err(ControlError::InvalidArg {
                what: "unknown recovery policy (expected abort or hold-last)",
            }),
        }
    }
}

/// Nonlinear model predictive controller.
///
/// Each cycle is `compute_control_input` followed by
/// `set_initial_condition` with the next measured state.
#[derive(Debug, Clone)]
pub struct NmpcController<M: DynamicsModel> {
    session: OcpSession<M>,
    last_control: Option<Vec<f64>>,
    last_iterations: usize,
}

impl<M: DynamicsModel> NmpcController<M> {
    pub fn new(config: OcpConfig, model: M, integrator: IntegratorType) -> ControlResult<Self> {
        Ok(Self::from_session(OcpSession::new(config, model, integrator)?))
    }

    pub fn from_session(session: OcpSession<M>) -> Self {
        Self {
            session,
            last_control: None,
            last_iterations: 0,
        }
    }

    /// Solve the OCP and return the first control of the plan.
    pub fn compute_control_input(&mut self) -> ControlResult<Vec<f64>> {
        let plan = self.session.solve()?;
        let u = plan.first_control();
        self.last_iterations = plan.iterations;
        self.last_control = Some(u.clone());
        Ok(u)
    }

    /// Feed the measured state back for the next cycle.
    pub fn set_initial_condition(&mut self, x_measured: &[f64]) -> ControlResult<()> {
        self.session.init(x_measured)
    }

    /// After a failed solve, return the control to hold for this cycle.
    pub fn hold_last_control(&mut self) -> ControlResult<Vec<f64>> {
        let plan = self.session.recover()?;
        let u = match &self.last_control {
            Some(u) => u.clone(),
            None => plan.first_control(),
        };
        self.last_iterations = 0;
        self.last_control = Some(u.clone());
        Ok(u)
    }

    pub fn last_control(&self) -> Option<&[f64]> {
        self.last_control.as_deref()
    }

    /// Solver iterations of the most recent cycle (zero when held).
    pub fn last_iterations(&self) -> usize {
        self.last_iterations
    }

    pub fn last_plan(&self) -> Option<&OcpSolution> {
        self.session.last_plan()
    }

    pub fn nx(&self) -> usize {
        self.session.config().nx
    }

    pub fn nu(&self) -> usize {
        self.session.config().nu
    }

    /// Configured initial state.
    pub fn x_0(&self) -> &[f64] {
        &self.session.config().x_0
    }

    pub fn session(&self) -> &OcpSession<M> {
        &self.session
    }
}
