//! Optimal control problem configuration.

use std::fmt;
use std::str::FromStr;

use nmpc_solver::Method;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// NLP backend used to solve the transcribed problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Augmented Lagrangian method with PANOC subproblems. Configurations
    /// written for IPOPT select it under the name `ipopt`.
    #[default]
    Alm,
    /// Quadratic penalty method with PANOC subproblems.
    Penalty,
}

impl SolverKind {
    /// Every name accepted by [`FromStr`].
    pub const NAMES: [&'static str; 4] = ["alm", "augmented_lagrangian", "ipopt", "penalty"];

    pub fn method(&self) -> Method {
        match self {
            SolverKind::Alm => Method::AugmentedLagrangian,
            SolverKind::Penalty => Method::QuadraticPenalty,
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Alm => write!(f, "alm"),
            SolverKind::Penalty => write!(f, "penalty"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alm" | "augmented_lagrangian" | "ipopt" => Ok(SolverKind::Alm),
            "penalty" => Ok(SolverKind::Penalty),
            _ => Err(ControlError::InvalidArg {
                what: "unknown solver (expected alm, ipopt or penalty)",
            }),
        }
    }
}

/// How the previous solution seeds the next solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmStartStrategy {
    /// Reuse the previous trajectories verbatim.
    #[default]
    Reuse,
    /// Drop the first stage and duplicate the last one.
    Shift,
}

impl fmt::Display for WarmStartStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarmStartStrategy::Reuse => write!(f, "reuse"),
            WarmStartStrategy::Shift => write!(f, "shift"),
        }
    }
}

impl WarmStartStrategy {
    /// Every name accepted by [`FromStr`].
    pub const NAMES: [&'static str; 2] = ["reuse", "shift"];
}

impl FromStr for WarmStartStrategy {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reuse" => Ok(WarmStartStrategy::Reuse),
            "shift" => Ok(WarmStartStrategy::Shift),
            _ => Err(ControlError::InvalidArg {
                what: "unknown warm start strategy (expected reuse or shift)",
            }),
        }
    }
}

/// Box constraints on a subset of vector entries, in physical units.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxConstraints {
    pub index: Vec<usize>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl BoxConstraints {
    fn validate(&self, dim: usize, what: &'static str) -> ControlResult<()> {
        check_len(self.min.len(), self.index.len(), what)?;
        check_len(self.max.len(), self.index.len(), what)?;
        check_indices(&self.index, dim, what)?;
        for (lo, hi) in self.min.iter().zip(&self.max) {
            if lo.is_nan() || hi.is_nan() || lo >= hi {
                return Err(ControlError::InvalidArg {
                    what: "box constraint min must be less than max",
                });
            }
        }
        Ok(())
    }
}

/// One finite-horizon optimal control problem.
///
/// Weights and bounds are in physical units; `sc_x`/`sc_u` only condition
/// the NLP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcpConfig {
    pub nx: usize,
    pub nu: usize,
    /// Number of shooting intervals
    pub n_shoot: usize,
    /// Interval length
    pub dt: f64,
    pub solver: SolverKind,
    /// Initial state
    pub x_0: Vec<f64>,
    /// Target state (length `nx`)
    pub x_e: Vec<f64>,
    /// Entries of the state tracked by the cost
    pub x_e_index: Vec<usize>,
    /// Running state weights, one per `x_e_index` entry
    pub q: Vec<f64>,
    /// Running control weights, one per control
    pub r: Vec<f64>,
    /// Terminal state weights, one per `x_e_index` entry
    pub p: Vec<f64>,
    pub x_con: BoxConstraints,
    pub u_con: BoxConstraints,
    pub sc_x: Vec<f64>,
    pub sc_u: Vec<f64>,
    pub warm_start: WarmStartStrategy,
    pub max_iter: usize,
    pub tol: f64,
}

impl OcpConfig {
    /// Check dimensions, indices, scales and weights.
    pub fn validate(&self) -> ControlResult<()> {
        if self.nx == 0 || self.nu == 0 {
            return Err(ControlError::InvalidArg {
                what: "nx and nu must be positive",
            });
        }
        if self.n_shoot == 0 {
            return Err(ControlError::InvalidArg {
                what: "n_shoot must be positive",
            });
        }
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "ocp dt must be positive",
            });
        }
        if !(self.tol > 0.0) || self.max_iter == 0 {
            return Err(ControlError::InvalidArg {
                what: "solver tolerance and iteration limit must be positive",
            });
        }

        check_len(self.x_0.len(), self.nx, "x_0")?;
        check_len(self.x_e.len(), self.nx, "x_e")?;
        check_len(self.sc_x.len(), self.nx, "state scale")?;
        check_len(self.sc_u.len(), self.nu, "control scale")?;
        check_len(self.r.len(), self.nu, "r")?;
        check_len(self.q.len(), self.x_e_index.len(), "q")?;
        check_len(self.p.len(), self.x_e_index.len(), "p")?;
        check_indices(&self.x_e_index, self.nx, "x_e_index")?;

        if self.x_0.iter().chain(&self.x_e).any(|v| !v.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "x_0 and x_e must be finite",
            });
        }
        if self
            .sc_x
            .iter()
            .chain(&self.sc_u)
            .any(|s| !(*s > 0.0) || !s.is_finite())
        {
            return Err(ControlError::InvalidArg {
                what: "scale factors must be positive and finite",
            });
        }
        if self
            .q
            .iter()
            .chain(&self.r)
            .chain(&self.p)
            .any(|w| !(*w >= 0.0) || !w.is_finite())
        {
            return Err(ControlError::InvalidArg {
                what: "cost weights must be non-negative",
            });
        }

        self.x_con.validate(self.nx, "state constraint")?;
        self.u_con.validate(self.nu, "control constraint")?;
        Ok(())
    }
}

fn check_len(got: usize, expected: usize, what: &'static str) -> ControlResult<()> {
    if got != expected {
        return Err(ControlError::Dimension {
            what,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_indices(index: &[usize], len: usize, what: &'static str) -> ControlResult<()> {
    for (k, &i) in index.iter().enumerate() {
        if i >= len {
            return Err(ControlError::IndexOutOfRange {
                what,
                index: i,
                len,
            });
        }
        if index[..k].contains(&i) {
            return Err(ControlError::InvalidArg {
                what: "duplicate constraint or cost index",
            });
        }
    }
    Ok(())
}
