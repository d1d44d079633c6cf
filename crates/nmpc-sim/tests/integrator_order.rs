//! Convergence order of the integrators on `x_dot = -a x`.
//!
//! Halving dt should shrink the global error at a fixed horizon by ~2x
//! for Forward Euler and ~16x for RK4.

use nmpc_core::Scalar;
use nmpc_sim::{DynamicsModel, ForwardEuler, Integrator, RK4, SimResult};

struct LinearDecay {
    a: f64,
}

impl DynamicsModel for LinearDecay {
    fn nx(&self) -> usize {
        1
    }

    fn nu(&self) -> usize {
        0
    }

    fn derivative<S: Scalar>(&self, x: &[S], _u: &[S]) -> SimResult<Vec<S>> {
        Ok(vec![-x[0] * self.a])
    }
}

fn global_error<I: Integrator>(integrator: &I, dt: f64, horizon: f64) -> f64 {
    let model = LinearDecay { a: 1.0 };
    let steps = (horizon / dt).round() as usize;
    let mut x = vec![1.0f64];
    for _ in 0..steps {
        x = integrator.step(&model, dt, &x, &[]).unwrap();
    }
    (x[0] - (-model.a * horizon).exp()).abs()
}

#[test]
fn forward_euler_is_first_order() {
    let dts = [0.1, 0.05, 0.025];
    let errs: Vec<f64> = dts.iter().map(|&dt| global_error(&ForwardEuler, dt, 1.0)).collect();
    for w in errs.windows(2) {
        let ratio = w[0] / w[1];
        assert!(ratio > 1.8 && ratio < 2.2, "Euler error ratio {ratio}");
    }
}

#[test]
fn rk4_is_fourth_order() {
    let dts = [0.1, 0.05, 0.025];
    let errs: Vec<f64> = dts.iter().map(|&dt| global_error(&RK4, dt, 1.0)).collect();
    for w in errs.windows(2) {
        let ratio = w[0] / w[1];
        assert!(ratio > 13.0 && ratio < 19.0, "RK4 error ratio {ratio}");
    }
}

#[test]
fn rk4_beats_euler_at_same_step() {
    assert!(global_error(&RK4, 0.1, 1.0) < 1e-3 * global_error(&ForwardEuler, 0.1, 1.0));
}
