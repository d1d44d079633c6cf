//! Double inverted pendulum on a cart (Bogdanov 2004).
//!
//! States: cart position [m], lower and upper link angles [rad] (zero is
//! upright), then their three velocities. Control: horizontal force on the
//! cart [N]. Equations of motion come from the Lagrangian in the compact
//! form `D(q) q_ddot + C(q, q_dot) q_dot + G(q) = H u`.

use nmpc_core::{Scalar, linsolve};

use crate::error::{SimError, SimResult};
use crate::model::DynamicsModel;

/// Cart and pendulum parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DipcParams {
    /// Gravitational acceleration, m/s^2
    pub g: f64,
    /// Cart mass, kg
    pub m_0: f64,
    /// Lower link mass, kg
    pub m_1: f64,
    /// Upper link mass, kg
    pub m_2: f64,
    /// Lower link length, m
    pub l_1: f64,
    /// Upper link length, m
    pub l_2: f64,
}

impl DipcParams {
    /// Values used in the reference paper.
    pub fn reference() -> Self {
        Self {
            g: 9.81,
            m_0: 1.5,
            m_1: 0.5,
            m_2: 0.75,
            l_1: 0.5,
            l_2: 0.75,
        }
    }
}

/// Lumped inertia and gravity coefficients derived once from [`DipcParams`].
#[derive(Clone, Debug, PartialEq)]
struct Coefficients {
    d_1: f64,
    d_2: f64,
    d_3: f64,
    d_4: f64,
    d_5: f64,
    d_6: f64,
    f_1: f64,
    f_2: f64,
}

impl Coefficients {
    fn from_params(p: &DipcParams) -> Self {
        Self {
            d_1: p.m_0 + p.m_1 + p.m_2,
            d_2: (p.m_1 / 2.0 + p.m_2) * p.l_1,
            d_3: p.m_2 * p.l_2 / 2.0,
            d_4: (p.m_1 / 3.0 + p.m_2) * p.l_1.powi(2),
            d_5: p.m_2 * p.l_1 * p.l_2 / 2.0,
            d_6: p.m_2 * p.l_2.powi(2) / 3.0,
            f_1: (p.m_1 / 2.0 + p.m_2) * p.l_1 * p.g,
            f_2: p.m_2 * p.l_2 * p.g / 2.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DipcModel {
    params: DipcParams,
    coeff: Coefficients,
}

impl DipcModel {
    pub const NX: usize = 6;
    pub const NU: usize = 1;

    pub fn new(params: DipcParams) -> SimResult<Self> {
        let positive = [
            (params.m_0, "m_0"),
            (params.m_1, "m_1"),
            (params.m_2, "m_2"),
            (params.l_1, "L_1"),
            (params.l_2, "L_2"),
        ];
        for (value, name) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(SimError::NonPhysical {
                    what: format!("DIPC parameter {name} must be positive, got {value}"),
                });
            }
        }
        if !params.g.is_finite() {
            return Err(SimError::NonPhysical {
                what: format!("DIPC parameter g must be finite, got {}", params.g),
            });
        }
        let coeff = Coefficients::from_params(&params);
        Ok(Self { params, coeff })
    }

    pub fn params(&self) -> &DipcParams {
        &self.params
    }

    /// Mass matrix `D`, Coriolis matrix `C` and gravity vector `G`.
    fn system_matrices<S: Scalar>(&self, q: &[S], q_dot: &[S]) -> ([[S; 3]; 3], [[S; 3]; 3], [S; 3]) {
        let k = &self.coeff;
        let c = |v: f64| S::from(v);
        let zero = c(0.0);

        let cos1 = q[1].cos();
        let cos2 = q[2].cos();
        let cos12 = (q[1] - q[2]).cos();
        let sin1 = q[1].sin();
        let sin2 = q[2].sin();
        let sin12 = (q[1] - q[2]).sin();

        let d = [
            [c(k.d_1), cos1 * k.d_2, cos2 * k.d_3],
            [cos1 * k.d_2, c(k.d_4), cos12 * k.d_5],
            [cos2 * k.d_3, cos12 * k.d_5, c(k.d_6)],
        ];
        let cor = [
            [zero, -sin1 * q_dot[1] * k.d_2, -sin2 * q_dot[2] * k.d_3],
            [zero, zero, sin12 * q_dot[2] * k.d_5],
            [zero, -sin12 * q_dot[1] * k.d_5, zero],
        ];
        let g = [zero, -sin1 * k.f_1, -sin2 * k.f_2];
        (d, cor, g)
    }
}

impl DynamicsModel for DipcModel {
    fn nx(&self) -> usize {
        Self::NX
    }

    fn nu(&self) -> usize {
        Self::NU
    }

    fn derivative<S: Scalar>(&self, x: &[S], u: &[S]) -> SimResult<Vec<S>> {
        self.check_dims(x, u)?;
        let (q, q_dot) = x.split_at(3);
        let (d, cor, g) = self.system_matrices(q, q_dot);

        // H = [1, 0, 0]^T: the force acts on the cart only.
        let h_u = [u[0], S::from(0.0), S::from(0.0)];
        let rhs: Vec<S> = (0..3)
            .map(|i| {
                let c_qdot = cor[i][0] * q_dot[0] + cor[i][1] * q_dot[1] + cor[i][2] * q_dot[2];
                h_u[i] - c_qdot - g[i]
            })
            .collect();
        let mass: Vec<Vec<S>> = d.iter().map(|row| row.to_vec()).collect();
        let q_ddot = linsolve(&mass, &rhs)?;

        let mut dx = Vec::with_capacity(Self::NX);
        dx.extend_from_slice(q_dot);
        dx.extend(q_ddot);
        Ok(dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DipcModel {
        DipcModel::new(DipcParams::reference()).unwrap()
    }

    #[test]
    fn upright_is_equilibrium() {
        let dx = model().derivative(&[0.0; 6], &[0.0]).unwrap();
        for v in dx {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn upright_is_unstable() {
        // Tilting the lower link with no force makes it fall further.
        let dx = model()
            .derivative(&[0.0, 0.1, 0.0, 0.0, 0.0, 0.0], &[0.0])
            .unwrap();
        assert!(dx[4] > 0.0);
    }

    #[test]
    fn push_accelerates_cart() {
        let dx = model().derivative(&[0.0; 6], &[1.0]).unwrap();
        assert!(dx[3] > 0.0);
        // Links lag behind the cart.
        assert!(dx[4] < 0.0);
    }

    #[test]
    fn velocities_feed_positions() {
        let dx = model()
            .derivative(&[0.0, 0.0, 0.0, 0.3, -0.2, 0.1], &[0.0])
            .unwrap();
        assert_eq!(&dx[..3], &[0.3, -0.2, 0.1]);
    }

    #[test]
    fn rejects_zero_mass() {
        let mut p = DipcParams::reference();
        p.m_1 = 0.0;
        assert!(DipcModel::new(p).is_err());
    }
}
