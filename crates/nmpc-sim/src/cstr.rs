//! Continuous stirred tank reactor (van de Vusse reaction, Klatt & Engell benchmark).
//!
//! States: `c_A` [mol/l], `c_B` [mol/l], reactor temperature `theta` [degC],
//! jacket temperature `theta_K` [degC]. Controls: specific feed `V_dot/V_R`
//! [1/h] and jacket heat removal `Q_dot_K` [kJ/h]. Time is in hours.

use nmpc_core::Scalar;

use crate::error::{SimError, SimResult};
use crate::model::DynamicsModel;

/// Offset from degC to K in the Arrhenius terms.
const CELSIUS_TO_KELVIN: f64 = 273.15;

/// Physico-chemical reactor parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CstrParams {
    /// 1/h
    pub k_10: f64,
    /// 1/h
    pub k_20: f64,
    /// 1/(mol A h)
    pub k_30: f64,
    /// K
    pub e_1: f64,
    /// K
    pub e_2: f64,
    /// K
    pub e_3: f64,
    /// kJ/(mol A)
    pub dh_ab: f64,
    /// kJ/(mol B)
    pub dh_bc: f64,
    /// kJ/(mol A)
    pub dh_ad: f64,
    /// kg/l
    pub rho: f64,
    /// kJ/(kg K)
    pub c_p: f64,
    /// kJ/(h m^2 K)
    pub k_w: f64,
    /// m^2
    pub a_r: f64,
    /// l
    pub v_r: f64,
    /// kg
    pub m_k: f64,
    /// kJ/(kg K)
    pub c_pk: f64,
    /// Feed concentration of A at the operating point, mol/l
    pub c_a0: f64,
    /// Feed temperature at the operating point, degC
    pub theta_0: f64,
}

impl CstrParams {
    /// Feed concentration used by the benchmark operating point.
    pub const DEFAULT_C_A0: f64 = 5.1;
    /// Feed temperature used by the benchmark operating point.
    pub const DEFAULT_THETA_0: f64 = 104.9;

    /// Nominal benchmark values.
    pub fn benchmark() -> Self {
        Self {
            k_10: 1.287e12,
            k_20: 1.287e12,
            k_30: 9.043e9,
            e_1: -9758.3,
            e_2: -9758.3,
            e_3: -8560.0,
            dh_ab: 4.2,
            dh_bc: -11.0,
            dh_ad: -41.85,
            rho: 0.9342,
            c_p: 3.01,
            k_w: 4032.0,
            a_r: 0.215,
            v_r: 10.0,
            m_k: 5.0,
            c_pk: 2.0,
            c_a0: Self::DEFAULT_C_A0,
            theta_0: Self::DEFAULT_THETA_0,
        }
    }
}

/// CSTR dynamics from component balances for A and B and energy balances
/// for the reactor and the cooling jacket.
#[derive(Clone, Debug)]
pub struct CstrModel {
    params: CstrParams,
}

impl CstrModel {
    pub const NX: usize = 4;
    pub const NU: usize = 2;

    pub fn new(params: CstrParams) -> SimResult<Self> {
        let positive = [
            (params.rho, "rho"),
            (params.c_p, "C_p"),
            (params.v_r, "V_R"),
            (params.m_k, "m_K"),
            (params.c_pk, "C_PK"),
        ];
        for (value, name) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(SimError::NonPhysical {
                    what: format!("CSTR parameter {name} must be positive, got {value}"),
                });
            }
        }
        let finite = [
            (params.k_10, "k_10"),
            (params.k_20, "k_20"),
            (params.k_30, "k_30"),
            (params.e_1, "E_1"),
            (params.e_2, "E_2"),
            (params.e_3, "E_3"),
            (params.dh_ab, "dH_AB"),
            (params.dh_bc, "dH_BC"),
            (params.dh_ad, "dH_AD"),
            (params.k_w, "k_w"),
            (params.a_r, "A_R"),
            (params.theta_0, "theta_0"),
        ];
        for (value, name) in finite {
            if !value.is_finite() {
                return Err(SimError::NonPhysical {
                    what: format!("CSTR parameter {name} must be finite, got {value}"),
                });
            }
        }
        if !(params.c_a0 >= 0.0) || !params.c_a0.is_finite() {
            return Err(SimError::NonPhysical {
                what: format!(
                    "CSTR feed concentration c_A0 must be non-negative, got {}",
                    params.c_a0
                ),
            });
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &CstrParams {
        &self.params
    }
}

impl DynamicsModel for CstrModel {
    fn nx(&self) -> usize {
        Self::NX
    }

    fn nu(&self) -> usize {
        Self::NU
    }

    fn derivative<S: Scalar>(&self, x: &[S], u: &[S]) -> SimResult<Vec<S>> {
        self.check_dims(x, u)?;
        let p = &self.params;
        let c = |v: f64| S::from(v);

        let (c_a, c_b, theta, theta_k) = (x[0], x[1], x[2], x[3]);
        let (feed, q_k) = (u[0], u[1]);

        // Arrhenius rate constants
        let t_abs = theta + c(CELSIUS_TO_KELVIN);
        let k1 = (c(p.e_1) / t_abs).exp() * p.k_10;
        let k2 = (c(p.e_2) / t_abs).exp() * p.k_20;
        let k3 = (c(p.e_3) / t_abs).exp() * p.k_30;
        let c_a2 = c_a.powi(2);

        let rho_cp = p.rho * p.c_p;
        let heat_of_reaction =
            k1 * c_a * p.dh_ab + k2 * c_b * p.dh_bc + k3 * c_a2 * p.dh_ad;

        let dc_a = feed * (c(p.c_a0) - c_a) - k1 * c_a - k3 * c_a2;
        let dc_b = -feed * c_b + k1 * c_a - k2 * c_b;
        let dtheta = feed * (c(p.theta_0) - theta) - heat_of_reaction / rho_cp
            + (theta_k - theta) * (p.k_w * p.a_r / (rho_cp * p.v_r));
        let dtheta_k = (q_k + (theta - theta_k) * (p.k_w * p.a_r)) / (p.m_k * p.c_pk);

        Ok(vec![dc_a, dc_b, dtheta, dtheta_k])
    }
}
