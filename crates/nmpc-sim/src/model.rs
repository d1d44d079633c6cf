//! DynamicsModel trait and the closed set of plant models.

use std::fmt;
use std::str::FromStr;

use nmpc_core::Scalar;

use crate::cstr::CstrModel;
use crate::dipc::DipcModel;
use crate::error::{SimError, SimResult};

/// Continuous-time plant dynamics `x_dot = f(x, u)`.
///
/// Implementations hold immutable physical parameters and must be pure:
/// the same `(x, u)` always yields the same derivative. The formula is
/// written against [`Scalar`] (any `DualNum<f64>`) so it can be evaluated
/// numerically and with dual numbers from a single source.
pub trait DynamicsModel {
    /// Number of states.
    fn nx(&self) -> usize;

    /// Number of controls.
    fn nu(&self) -> usize;

    /// Compute the state derivative.
    fn derivative<S: Scalar>(&self, x: &[S], u: &[S]) -> SimResult<Vec<S>>;

    /// Check argument lengths against `nx` / `nu`.
    fn check_dims<S: Scalar>(&self, x: &[S], u: &[S]) -> SimResult<()> {
        if x.len() != self.nx() {
            return Err(SimError::Dimension {
                what: "state",
                expected: self.nx(),
                got: x.len(),
            });
        }
        if u.len() != self.nu() {
            return Err(SimError::Dimension {
                what: "control",
                expected: self.nu(),
                got: u.len(),
            });
        }
        Ok(())
    }
}

/// Which plant a configuration describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ModelKind {
    /// Double inverted pendulum on a cart.
    #[default]
    Dipc,
    /// Continuous stirred tank reactor (van de Vusse benchmark).
    Cstr,
}

impl ModelKind {
    /// Prefix used for output artifacts.
    pub fn prefix(&self) -> &'static str {
        match self {
            ModelKind::Dipc => "DIPC",
            ModelKind::Cstr => "CSTR",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Dipc => write!(f, "dipc"),
            ModelKind::Cstr => write!(f, "cstr"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dipc" => Ok(ModelKind::Dipc),
            "cstr" => Ok(ModelKind::Cstr),
            _ => Err(SimError::Unknown {
                what: "model",
                name: s.to_string(),
            }),
        }
    }
}

/// Closed variant set of supported plants, selected at configuration time.
#[derive(Clone, Debug)]
pub enum Model {
    Cstr(CstrModel),
    Dipc(DipcModel),
}

impl Model {
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Cstr(_) => ModelKind::Cstr,
            Model::Dipc(_) => ModelKind::Dipc,
        }
    }
}

impl DynamicsModel for Model {
    fn nx(&self) -> usize {
        match self {
            Model::Cstr(m) => m.nx(),
            Model::Dipc(m) => m.nx(),
        }
    }

    fn nu(&self) -> usize {
        match self {
            Model::Cstr(m) => m.nu(),
            Model::Dipc(m) => m.nu(),
        }
    }

    fn derivative<S: Scalar>(&self, x: &[S], u: &[S]) -> SimResult<Vec<S>> {
        match self {
            Model::Cstr(m) => m.derivative(x, u),
            Model::Dipc(m) => m.derivative(x, u),
        }
    }
}

impl From<CstrModel> for Model {
    fn from(m: CstrModel) -> Self {
        Model::Cstr(m)
    }
}

impl From<DipcModel> for Model {
    fn from(m: DipcModel) -> Self {
        Model::Dipc(m)
    }
}
