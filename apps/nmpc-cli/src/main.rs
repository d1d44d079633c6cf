use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nmpc_app::{AppResult, RunOptions, RunRequest, run_service};
use nmpc_controls::RecoveryPolicy;
use nmpc_sim::{IntegratorType, ModelKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nmpc-cli")]
#[command(about = "Closed-loop nonlinear model predictive control simulation", long_about = None)]
struct Cli {
    /// Controller configuration (horizon, weights, constraints, timing)
    config: PathBuf,
    /// Model parameters used for prediction inside the controller
    controller_model: PathBuf,
    /// Model parameters of the simulated plant
    plant_model: PathBuf,
    /// Plant family: dipc or cstr
    #[arg(long, default_value = "dipc")]
    model: ModelKind,
    /// Integrator for prediction and plant simulation: rk4 or euler
    #[arg(long, default_value = "rk4")]
    integrator: IntegratorType,
    /// Directory for SVG plots
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Write the closed-loop record as JSON
    #[arg(long)]
    export: Option<PathBuf>,
    /// On solver failure: abort or hold-last
    #[arg(long, default_value = "abort")]
    recovery: RecoveryPolicy,
    /// Skip writing plots
    #[arg(long)]
    no_plots: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // clap prints usage to stderr and exits non-zero on bad arguments.
    let cli = Cli::parse();

    match cmd_run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(cli: Cli) -> AppResult<()> {
    info!(
        config = %cli.config.display(),
        model = %cli.model,
        integrator = %cli.integrator,
        recovery = %cli.recovery,
        "starting closed-loop run"
    );
    let request = RunRequest {
        controller_config: &cli.config,
        controller_model: &cli.controller_model,
        plant_model: &cli.plant_model,
        options: RunOptions {
            model: cli.model,
            integrator: cli.integrator,
            recovery: cli.recovery,
            output_dir: cli.output_dir.clone(),
            export: cli.export.clone(),
            plots: !cli.no_plots,
        },
    };

    let response = run_service::run(&request)?;
    let record = &response.record;
    info!(
        steps = record.steps(),
        recoveries = record.recoveries,
        artifacts = response.artifacts.len(),
        "closed-loop run complete"
    );

    println!("Closed loop finished");
    println!("  Steps: {}", record.steps());
    println!("  Recoveries: {}", record.recoveries);
    if let Some(x) = record.final_state() {
        println!("  Final state: {x:?}");
    }
    println!(
        "  Timing: load {:.3}s, loop {:.3}s, output {:.3}s",
        response.timing.load_time_s, response.timing.loop_time_s, response.timing.output_time_s
    );
    for path in &response.artifacts {
        println!("  Wrote {}", path.display());
    }
    Ok(())
}
