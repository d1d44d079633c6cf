//! End-to-end closed-loop run: load, compile, simulate, export.

use std::path::{Path, PathBuf};
use std::time::Instant;

use nmpc_controls::{NmpcController, RecoveryPolicy};
use nmpc_sim::{IntegratorType, ModelKind, Simulator};
use tracing::info;

use crate::closed_loop::{run_closed_loop, ClosedLoopRecord};
use crate::compile;
use crate::error::{AppError, AppResult};
use crate::plot;

/// Options for a closed-loop run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub model: ModelKind,
    pub integrator: IntegratorType,
    pub recovery: RecoveryPolicy,
    /// Directory for SVG plots
    pub output_dir: PathBuf,
    /// JSON export of the closed-loop record
    pub export: Option<PathBuf>,
    pub plots: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            integrator: IntegratorType::default(),
            recovery: RecoveryPolicy::default(),
            output_dir: PathBuf::from("."),
            export: None,
            plots: true,
        }
    }
}

/// Input files of a run.
pub struct RunRequest<'a> {
    pub controller_config: &'a Path,
    /// Model used for prediction inside the controller
    pub controller_model: &'a Path,
    /// Model of the simulated plant
    pub plant_model: &'a Path,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub load_time_s: f64,
    pub loop_time_s: f64,
    pub output_time_s: f64,
}

#[derive(Debug)]
pub struct RunResponse {
    pub record: ClosedLoopRecord,
    /// Plot and export files written by the run
    pub artifacts: Vec<PathBuf>,
    pub timing: RunTimingSummary,
}

/// Load every input, then run the closed loop and write outputs.
///
/// All files are parsed and validated before the first control cycle, so a
/// configuration error never leaves partial output behind.
pub fn run(request: &RunRequest<'_>) -> AppResult<RunResponse> {
    let options = &request.options;
    let mut timing = RunTimingSummary::default();

    let load_start = Instant::now();
    let file = nmpc_project::load_controller(request.controller_config)?;
    let ocp = compile::ocp_config(&file)?;
    let sim_params = compile::sim_params(&file)?;
    let controller_model = compile::load_model(options.model, request.controller_model)?;
    let plant_model = compile::load_model(options.model, request.plant_model)?;

    let mut controller = NmpcController::new(ocp, controller_model, options.integrator)?;
    let simulator = Simulator::new(plant_model, options.integrator, sim_params);
    timing.load_time_s = load_start.elapsed().as_secs_f64();

    info!(
        model = %options.model,
        integrator = %options.integrator,
        "inputs loaded"
    );

    let loop_start = Instant::now();
    let record = run_closed_loop(&mut controller, &simulator, options.recovery)?;
    timing.loop_time_s = loop_start.elapsed().as_secs_f64();

    let output_start = Instant::now();
    let prefix = options.model.prefix();
    let mut artifacts = Vec::new();
    if let Some(path) = &options.export {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AppError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        record.write_json(path)?;
        artifacts.push(path.clone());
    }
    if options.plots {
        artifacts.extend(plot::plot_record(&record, prefix, &options.output_dir)?);
    }
    timing.output_time_s = output_start.elapsed().as_secs_f64();

    info!(
        steps = record.steps(),
        artifacts = artifacts.len(),
        loop_time_s = timing.loop_time_s,
        "run finished"
    );

    Ok(RunResponse {
        record,
        artifacts,
        timing,
    })
}
