//! Turn parsed configuration files into runtime objects.

use std::path::Path;

use nmpc_controls::{BoxConstraints, OcpConfig, SolverKind, WarmStartStrategy};
use nmpc_project::{ControllerFile, CstrModelFile, DipcModelFile};
use nmpc_sim::{CstrModel, CstrParams, DipcModel, DipcParams, Model, ModelKind, SimParams};

use crate::error::{AppError, AppResult};

/// Outer augmented Lagrangian iterations.
const DEFAULT_MAX_ITER: usize = 100;
const DEFAULT_TOL: f64 = 1e-6;

pub fn ocp_config(file: &ControllerFile) -> AppResult<OcpConfig> {
    let solver: SolverKind = file
        .solver
        .parse()
        .map_err(|e| AppError::Compile(format!("ocp.solver: {e}")))?;
    let warm_start = match &file.warm_start {
        Some(name) => name
            .parse()
            .map_err(|e| AppError::Compile(format!("ocp.warm_start: {e}")))?,
        None => WarmStartStrategy::default(),
    };

    let config = OcpConfig {
        nx: file.nx,
        nu: file.nu,
        n_shoot: file.n_shoot,
        dt: file.ocp_dt,
        solver,
        x_0: file.x_0.clone(),
        x_e: file.x_e.clone(),
        x_e_index: file.x_e_index.clone(),
        q: file.q.clone(),
        r: file.r.clone(),
        p: file.p.clone(),
        x_con: BoxConstraints {
            index: file.x_index.clone(),
            min: file.x_min.clone(),
            max: file.x_max.clone(),
        },
        u_con: BoxConstraints {
            index: file.u_index.clone(),
            min: file.u_min.clone(),
            max: file.u_max.clone(),
        },
        sc_x: file.scale_x.clone(),
        sc_u: file.scale_u.clone(),
        warm_start,
        max_iter: file.max_iter.unwrap_or(DEFAULT_MAX_ITER),
        tol: file.tol.unwrap_or(DEFAULT_TOL),
    };
    config
        .validate()
        .map_err(|e| AppError::Compile(format!("ocp: {e}")))?;
    Ok(config)
}

pub fn sim_params(file: &ControllerFile) -> AppResult<SimParams> {
    Ok(SimParams::new(file.sim_t0, file.sim_tf, file.sim_dt)?)
}

pub fn dipc_model(file: &DipcModelFile) -> AppResult<DipcModel> {
    let params = DipcParams {
        g: file.g,
        m_0: file.m_0,
        m_1: file.m_1,
        m_2: file.m_2,
        l_1: file.l_1,
        l_2: file.l_2,
    };
    Ok(DipcModel::new(params)?)
}

pub fn cstr_model(file: &CstrModelFile) -> AppResult<CstrModel> {
    let params = CstrParams {
        k_10: file.k_10,
        k_20: file.k_20,
        k_30: file.k_30,
        e_1: file.e_1,
        e_2: file.e_2,
        e_3: file.e_3,
        dh_ab: file.dh_ab,
        dh_bc: file.dh_bc,
        dh_ad: file.dh_ad,
        rho: file.rho,
        c_p: file.c_p,
        k_w: file.k_w,
        a_r: file.a_r,
        v_r: file.v_r,
        m_k: file.m_k,
        c_pk: file.c_pk,
        c_a0: file.c_a0,
        theta_0: file.theta_0,
    };
    Ok(CstrModel::new(params)?)
}

/// Load a model file of the given kind.
pub fn load_model(kind: ModelKind, path: &Path) -> AppResult<Model> {
    Ok(match kind {
        ModelKind::Dipc => Model::from(dipc_model(&nmpc_project::load_dipc_model(path)?)?),
        ModelKind::Cstr => Model::from(cstr_model(&nmpc_project::load_cstr_model(path)?)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn configs() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs")
    }

    fn dipc_file() -> ControllerFile {
        nmpc_project::load_controller(&configs().join("dipc/nmpc.yaml")).unwrap()
    }

    #[test]
    fn shipped_dipc_config_compiles() {
        let config = ocp_config(&dipc_file()).unwrap();
        assert_eq!(config.solver, SolverKind::Alm);
        assert_eq!(config.warm_start, WarmStartStrategy::Reuse);
        assert_eq!(config.max_iter, DEFAULT_MAX_ITER);
        assert_eq!(config.tol, 1e-6);
    }

    #[test]
    fn out_of_range_index_is_compile_error() {
        let mut file = dipc_file();
        file.x_index = vec![6];
        let err = ocp_config(&file).unwrap_err();
        assert!(
            matches!(err, AppError::Compile(ref msg) if msg.contains("state constraint")),
            "{err}"
        );
    }

    #[test]
    fn unknown_names_report_their_key() {
        let mut file = dipc_file();
        file.solver = "snopt".to_string();
        assert!(ocp_config(&file).unwrap_err().to_string().contains("ocp.solver"));

        let mut file = dipc_file();
        file.warm_start = Some("extrapolate".to_string());
        assert!(ocp_config(&file).unwrap_err().to_string().contains("ocp.warm_start"));
    }

    #[test]
    fn empty_sim_window_rejected() {
        let mut file = dipc_file();
        file.sim_tf = file.sim_t0;
        assert!(sim_params(&file).is_err());
    }

    #[test]
    fn non_physical_models_rejected() {
        let mut pendulum =
            nmpc_project::load_dipc_model(&configs().join("dipc/model.yaml")).unwrap();
        pendulum.m_1 = 0.0;
        assert!(dipc_model(&pendulum).unwrap_err().to_string().contains("m_1"));

        let mut reactor =
            nmpc_project::load_cstr_model(&configs().join("cstr/model.yaml")).unwrap();
        reactor.c_a0 = -1.0;
        assert!(matches!(cstr_model(&reactor), Err(AppError::Simulation(_))));
    }
}
