//! SVG plots of closed-loop trajectories.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::closed_loop::ClosedLoopRecord;
use crate::error::{AppError, AppResult};

const SIZE: (u32, u32) = (800, 480);

fn plot_err(err: impl std::fmt::Display) -> AppError {
    AppError::Plot(err.to_string())
}

/// Axis range with a margin; flat series get a unit-wide window.
fn padded_range(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let span = hi - lo;
    if span < 1e-12 * (1.0 + lo.abs()) {
        return (lo - 0.5, hi + 0.5);
    }
    (lo - 0.05 * span, hi + 0.05 * span)
}

fn plot_series(path: &Path, title: &str, y_desc: &str, t: &[f64], values: &[f64]) -> AppResult<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (t_lo, t_hi) = padded_range(t);
    let (y_lo, y_hi) = padded_range(values);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(t_lo..t_hi, y_lo..y_hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("t")
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            t.iter().copied().zip(values.iter().copied()),
            &BLUE,
        ))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Write `<prefix>_x_<i>.svg` for every state and `<prefix>_u_<i>.svg` for
/// every control into `out_dir`. Returns the written paths.
pub fn plot_record(record: &ClosedLoopRecord, prefix: &str, out_dir: &Path) -> AppResult<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir).map_err(|source| AppError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let nx = record.x.first().map_or(0, Vec::len);
    let nu = record.u.first().map_or(0, Vec::len);
    let mut written = Vec::with_capacity(nx + nu);

    for i in 0..nx {
        let path = out_dir.join(format!("{prefix}_x_{i}.svg"));
        let title = format!("Simulated state x_{i} over time");
        plot_series(&path, &title, &format!("x_{i}"), &record.t, &record.state_series(i))?;
        written.push(path);
    }

    // Controls are held over [t_k, t_k+1); plot them at the interval start.
    let t_u = &record.t[..record.u.len()];
    for i in 0..nu {
        let path = out_dir.join(format!("{prefix}_u_{i}.svg"));
        let title = format!("Simulated control u_{i} over time");
        plot_series(&path, &title, &format!("u_{i}"), t_u, &record.control_series(i))?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_gets_window() {
        assert_eq!(padded_range(&[2.0, 2.0]), (1.5, 2.5));
        assert_eq!(padded_range(&[]), (-1.0, 1.0));
        let (lo, hi) = padded_range(&[0.0, 10.0]);
        assert!(lo < 0.0 && hi > 10.0);
    }

    #[test]
    fn writes_one_file_per_series() {
        let record = ClosedLoopRecord {
            t: vec![0.0, 0.5, 1.0],
            x: vec![vec![0.0, 1.0], vec![0.5, 0.8], vec![0.7, 0.5]],
            u: vec![vec![1.0], vec![0.2]],
            iterations: vec![3, 2],
            recoveries: 0,
        };
        let dir = std::env::temp_dir().join("nmpc_app_plot_test");
        let _ = std::fs::remove_dir_all(&dir);
        let paths = plot_record(&record, "TEST", &dir).unwrap();
        let names: Vec<String> = paths
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["TEST_x_0.svg", "TEST_x_1.svg", "TEST_u_0.svg"]);
        let svg = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(svg.contains("<svg"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
