//! Closed-loop driver coupling the controller and the plant simulator.

use std::path::Path;

use nmpc_controls::{ControlError, NmpcController, RecoveryPolicy};
use nmpc_sim::{DynamicsModel, Simulator};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Trajectories of one closed-loop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedLoopRecord {
    /// Sample times, `N + 1` entries
    pub t: Vec<f64>,
    /// Plant states at each sample time
    pub x: Vec<Vec<f64>>,
    /// Applied controls, one per interval
    pub u: Vec<Vec<f64>>,
    /// Solver iterations per cycle (zero when a control was held)
    pub iterations: Vec<usize>,
    /// Number of cycles where the recovery policy was applied
    pub recoveries: usize,
}

impl ClosedLoopRecord {
    pub fn steps(&self) -> usize {
        self.u.len()
    }

    pub fn state_series(&self, i: usize) -> Vec<f64> {
        self.x.iter().map(|x| x[i]).collect()
    }

    pub fn control_series(&self, i: usize) -> Vec<f64> {
        self.u.iter().map(|u| u[i]).collect()
    }

    pub fn final_state(&self) -> Option<&[f64]> {
        self.x.last().map(Vec::as_slice)
    }

    pub fn write_json(&self, path: &Path) -> AppResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| AppError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Run `floor((tf - t0) / dt)` control cycles.
///
/// Each cycle computes a control, advances the plant by one sample and feeds
/// the new state back. Solver failures abort the run unless `policy` is
/// [`RecoveryPolicy::HoldLast`].
pub fn run_closed_loop<Mc: DynamicsModel, Mp: DynamicsModel>(
    controller: &mut NmpcController<Mc>,
    simulator: &Simulator<Mp>,
    policy: RecoveryPolicy,
) -> AppResult<ClosedLoopRecord> {
    if controller.nx() != simulator.model().nx() || controller.nu() != simulator.model().nu() {
        return Err(AppError::InvalidInput(format!(
            "controller has nx={} nu={}, plant has nx={} nu={}",
            controller.nx(),
            controller.nu(),
            simulator.model().nx(),
            simulator.model().nu()
        )));
    }

    let params = *simulator.params();
    let steps = params.num_steps();
    let mut x = controller.x_0().to_vec();

    let mut record = ClosedLoopRecord {
        t: Vec::with_capacity(steps + 1),
        x: Vec::with_capacity(steps + 1),
        u: Vec::with_capacity(steps),
        iterations: Vec::with_capacity(steps),
        recoveries: 0,
    };
    record.t.push(params.t0);
    record.x.push(x.clone());

    info!(steps, dt = params.dt, %policy, "closed loop started");

    for k in 0..steps {
        let u = match controller.compute_control_input() {
            Ok(u) => u,
            Err(ControlError::Solver(err)) if policy == RecoveryPolicy::HoldLast => {
                warn!(step = k, error = %err, "solve failed, holding last control");
                record.recoveries += 1;
                controller.hold_last_control()?
            }
            Err(err) => return Err(err.into()),
        };

        let x_next = simulator.apply_control_for_time_step(&x, &u)?;
        controller.set_initial_condition(&x_next)?;

        let t = params.time_at(k + 1);
        info!(
            step = k,
            t,
            u = ?u,
            iterations = controller.last_iterations(),
            "control cycle"
        );

        record.iterations.push(controller.last_iterations());
        record.u.push(u);
        record.t.push(t);
        record.x.push(x_next.clone());
        x = x_next;
    }

    info!(recoveries = record.recoveries, "closed loop finished");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ClosedLoopRecord {
        ClosedLoopRecord {
            t: vec![0.0, 0.1, 0.2],
            x: vec![vec![1.0, 0.0], vec![0.9, -0.5], vec![0.8, -0.4]],
            u: vec![vec![-1.0], vec![0.5]],
            iterations: vec![12, 7],
            recoveries: 0,
        }
    }

    #[test]
    fn series_extraction() {
        let r = record();
        assert_eq!(r.steps(), 2);
        assert_eq!(r.state_series(1), vec![0.0, -0.5, -0.4]);
        assert_eq!(r.control_series(0), vec![-1.0, 0.5]);
        assert_eq!(r.final_state(), Some(&[0.8, -0.4][..]));
    }

    #[test]
    fn json_export_round_trips() {
        let path = std::env::temp_dir().join("nmpc_app_record_test.json");
        let r = record();
        r.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: ClosedLoopRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, r);
        let _ = std::fs::remove_file(&path);
    }
}
