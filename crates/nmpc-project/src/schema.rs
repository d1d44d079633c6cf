//! Configuration file schema.
//!
//! Field names follow Rust conventions; the serialized keys are the dotted
//! names used in the files.

use serde::{Deserialize, Serialize};

/// Controller configuration: simulation timing, problem dimensions, OCP
/// weights, constraints and scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerFile {
    #[serde(rename = "sim.t0")]
    pub sim_t0: f64,
    #[serde(rename = "sim.tf")]
    pub sim_tf: f64,
    #[serde(rename = "sim.dt")]
    pub sim_dt: f64,

    #[serde(rename = "nmpc.x_0")]
    pub x_0: Vec<f64>,
    #[serde(rename = "nmpc.x_e")]
    pub x_e: Vec<f64>,
    #[serde(rename = "nmpc.nx")]
    pub nx: usize,
    #[serde(rename = "nmpc.nu")]
    pub nu: usize,
    #[serde(rename = "nmpc.x_e_index")]
    pub x_e_index: Vec<usize>,

    #[serde(rename = "ocp.n_shoot")]
    pub n_shoot: usize,
    #[serde(rename = "ocp.dt")]
    pub ocp_dt: f64,
    #[serde(rename = "ocp.solver")]
    pub solver: String,
    #[serde(rename = "ocp.q")]
    pub q: Vec<f64>,
    #[serde(rename = "ocp.r")]
    pub r: Vec<f64>,
    #[serde(rename = "ocp.p")]
    pub p: Vec<f64>,

    #[serde(rename = "ocp.con.x_min")]
    pub x_min: Vec<f64>,
    #[serde(rename = "ocp.con.x_max")]
    pub x_max: Vec<f64>,
    #[serde(rename = "ocp.con.x_index")]
    pub x_index: Vec<usize>,
    #[serde(rename = "ocp.con.u_min")]
    pub u_min: Vec<f64>,
    #[serde(rename = "ocp.con.u_max")]
    pub u_max: Vec<f64>,
    #[serde(rename = "ocp.con.u_index")]
    pub u_index: Vec<usize>,

    #[serde(rename = "ocp.scale.x")]
    pub scale_x: Vec<f64>,
    #[serde(rename = "ocp.scale.u")]
    pub scale_u: Vec<f64>,

    /// `reuse` (default) or `shift`
    #[serde(rename = "ocp.warm_start", default, skip_serializing_if = "Option::is_none")]
    pub warm_start: Option<String>,
    #[serde(rename = "ocp.max_iter", default, skip_serializing_if = "Option::is_none")]
    pub max_iter: Option<usize>,
    #[serde(rename = "ocp.tol", default, skip_serializing_if = "Option::is_none")]
    pub tol: Option<f64>,
}

/// Double inverted pendulum on a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DipcModelFile {
    #[serde(rename = "model.g")]
    pub g: f64,
    #[serde(rename = "model.m_0")]
    pub m_0: f64,
    #[serde(rename = "model.m_1")]
    pub m_1: f64,
    #[serde(rename = "model.m_2")]
    pub m_2: f64,
    #[serde(rename = "model.L_1")]
    pub l_1: f64,
    #[serde(rename = "model.L_2")]
    pub l_2: f64,
}

fn default_c_a0() -> f64 {
    5.1
}

fn default_theta_0() -> f64 {
    104.9
}

/// Van de Vusse CSTR benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CstrModelFile {
    #[serde(rename = "model.k_10")]
    pub k_10: f64,
    #[serde(rename = "model.k_20")]
    pub k_20: f64,
    #[serde(rename = "model.k_30")]
    pub k_30: f64,
    #[serde(rename = "model.E_1")]
    pub e_1: f64,
    #[serde(rename = "model.E_2")]
    pub e_2: f64,
    #[serde(rename = "model.E_3")]
    pub e_3: f64,
    #[serde(rename = "model.dH_AB")]
    pub dh_ab: f64,
    #[serde(rename = "model.dH_BC")]
    pub dh_bc: f64,
    #[serde(rename = "model.dH_AD")]
    pub dh_ad: f64,
    #[serde(rename = "model.rho")]
    pub rho: f64,
    #[serde(rename = "model.C_p")]
    pub c_p: f64,
    #[serde(rename = "model.k_w")]
    pub k_w: f64,
    #[serde(rename = "model.A_R")]
    pub a_r: f64,
    #[serde(rename = "model.V_R")]
    pub v_r: f64,
    #[serde(rename = "model.m_K")]
    pub m_k: f64,
    #[serde(rename = "model.C_PK")]
    pub c_pk: f64,
    /// Feed concentration of A, mol/l
    #[serde(rename = "model.c_A0", default = "default_c_a0")]
    pub c_a0: f64,
    /// Feed temperature, degC
    #[serde(rename = "model.theta_0", default = "default_theta_0")]
    pub theta_0: f64,
}
