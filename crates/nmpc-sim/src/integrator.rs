//! Fixed-step time integrators.

use std::fmt;
use std::str::FromStr;

use nmpc_core::Scalar;
use nmpc_core::scalar::add_scaled;

use crate::error::{SimError, SimResult};
use crate::model::DynamicsModel;

/// Trait for one-step discretization schemes.
///
/// Stateless: the next state depends only on the model, `dt`, `x` and `u`
/// (zero-order hold on `u` over the step).
pub trait Integrator {
    /// Advance state by one time step.
    fn step<S: Scalar, M: DynamicsModel>(
        &self,
        model: &M,
        dt: f64,
        x: &[S],
        u: &[S],
    ) -> SimResult<Vec<S>>;
}

fn check_dt(dt: f64) -> SimResult<()> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(SimError::InvalidArg {
            what: "dt must be positive and finite",
        });
    }
    Ok(())
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Copy, Debug, Default)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<S: Scalar, M: DynamicsModel>(
        &self,
        model: &M,
        dt: f64,
        x: &[S],
        u: &[S],
    ) -> SimResult<Vec<S>> {
        check_dt(dt)?;
        let k1 = model.derivative(x, u)?;
        let k2 = model.derivative(&add_scaled(x, &k1, 0.5 * dt), u)?;
        let k3 = model.derivative(&add_scaled(x, &k2, 0.5 * dt), u)?;
        let k4 = model.derivative(&add_scaled(x, &k3, dt), u)?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        Ok(x.iter()
            .enumerate()
            .map(|(i, &xi)| {
                let k_sum = k1[i] + k2[i] * 2.0 + k3[i] * 2.0 + k4[i];
                xi + k_sum * (dt / 6.0)
            })
            .collect())
    }
}

/// Forward Euler (explicit, 1st order).
/// Calls the model once per step instead of 4 times (RK4).
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<S: Scalar, M: DynamicsModel>(
        &self,
        model: &M,
        dt: f64,
        x: &[S],
        u: &[S],
    ) -> SimResult<Vec<S>> {
        check_dt(dt)?;
        let xdot = model.derivative(x, u)?;
        Ok(add_scaled(x, &xdot, dt))
    }
}

/// Integrator selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (default, 4 model calls per step).
    #[default]
    RK4,
    /// Forward Euler (1st-order, 1 model call per step).
    ForwardEuler,
}

impl Integrator for IntegratorType {
    fn step<S: Scalar, M: DynamicsModel>(
        &self,
        model: &M,
        dt: f64,
        x: &[S],
        u: &[S],
    ) -> SimResult<Vec<S>> {
        match self {
            IntegratorType::RK4 => RK4.step(model, dt, x, u),
            IntegratorType::ForwardEuler => ForwardEuler.step(model, dt, x, u),
        }
    }
}

impl fmt::Display for IntegratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegratorType::RK4 => write!(f, "rk4"),
            IntegratorType::ForwardEuler => write!(f, "euler"),
        }
    }
}

impl FromStr for IntegratorType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rk4" => Ok(IntegratorType::RK4),
            "euler" | "forward_euler" => Ok(IntegratorType::ForwardEuler),
            _ => Err(SimError::Unknown {
                what: "integrator",
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmpc_core::Dual64;
    use proptest::prelude::*;

    /// x_dot = u (pure integrator)
    struct Ramp;

    impl DynamicsModel for Ramp {
        fn nx(&self) -> usize {
            1
        }

        fn nu(&self) -> usize {
            1
        }

        fn derivative<S: Scalar>(&self, _x: &[S], u: &[S]) -> SimResult<Vec<S>> {
            Ok(vec![u[0]])
        }
    }

    #[test]
    fn constant_input_is_exact_for_both_schemes() {
        let euler = ForwardEuler.step(&Ramp, 0.1, &[1.0], &[2.0]).unwrap();
        let rk4 = RK4.step(&Ramp, 0.1, &[1.0], &[2.0]).unwrap();
        assert!((euler[0] - 1.2).abs() < 1e-14);
        assert!((rk4[0] - 1.2).abs() < 1e-14);
    }

    #[test]
    fn non_positive_dt_rejected() {
        assert!(RK4.step(&Ramp, 0.0, &[1.0], &[2.0]).is_err());
        assert!(ForwardEuler.step(&Ramp, -0.1, &[1.0], &[2.0]).is_err());
    }

    #[test]
    fn integrator_type_dispatches() {
        let a = IntegratorType::ForwardEuler
            .step(&Ramp, 0.5, &[0.0], &[1.0])
            .unwrap();
        assert_eq!(a, vec![0.5]);
        assert_eq!(IntegratorType::default(), IntegratorType::RK4);
    }

    #[test]
    fn integrator_type_parse() {
        assert_eq!("RK4".parse::<IntegratorType>().unwrap(), IntegratorType::RK4);
        assert_eq!(
            "euler".parse::<IntegratorType>().unwrap(),
            IntegratorType::ForwardEuler
        );
        assert!("midpoint".parse::<IntegratorType>().is_err());
    }

    /// x_dot = -a x + sin(u)
    struct Damped;

    impl DynamicsModel for Damped {
        fn nx(&self) -> usize {
            1
        }

        fn nu(&self) -> usize {
            1
        }

        fn derivative<S: Scalar>(&self, x: &[S], u: &[S]) -> SimResult<Vec<S>> {
            Ok(vec![-x[0] * 0.7 + u[0].sin()])
        }
    }

    proptest! {
        #[test]
        fn dual_step_matches_f64_step(x in -5.0f64..5.0, u in -2.0f64..2.0, dt in 0.001f64..0.5) {
            for integrator in [IntegratorType::RK4, IntegratorType::ForwardEuler] {
                let plain = integrator.step(&Damped, dt, &[x], &[u]).unwrap();
                let dual = integrator
                    .step(&Damped, dt, &[Dual64::new(x, 1.0)], &[Dual64::new(u, 0.0)])
                    .unwrap();
                prop_assert!((dual[0].re - plain[0]).abs() < 1e-12);

                let h = 1e-6;
                let up = integrator.step(&Damped, dt, &[x + h], &[u]).unwrap();
                let dn = integrator.step(&Damped, dt, &[x - h], &[u]).unwrap();
                let fd = (up[0] - dn[0]) / (2.0 * h);
                prop_assert!((dual[0].eps - fd).abs() < 1e-6);
            }
        }

        #[test]
        fn rk4_tracks_linear_decay(x in -5.0f64..5.0, dt in 0.001f64..0.2) {
            let next = RK4.step(&Damped, dt, &[x], &[0.0]).unwrap();
            let exact = x * (-0.7 * dt).exp();
            prop_assert!((next[0] - exact).abs() < 1e-6 * (1.0 + x.abs()));
        }
    }
}
