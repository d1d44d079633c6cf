//! Generic arithmetic for dynamics formulas.
//!
//! Model equations are written once against [`Scalar`], a shorthand for
//! `num_dual::DualNum<f64> + Copy`, and evaluated with plain `f64` during
//! simulation or with [`Dual64`] when the transcriber needs exact first
//! derivatives of the discretized dynamics.

use std::fmt::Debug;

pub use num_dual::{Dual64, DualNum};

/// Scalar field used by models and integrators.
pub trait Scalar: DualNum<f64> + Copy + Debug + 'static {}

impl<T: DualNum<f64> + Copy + Debug + 'static> Scalar for T {}

/// `x + h * k`, element-wise.
pub fn add_scaled<S: Scalar>(x: &[S], k: &[S], h: f64) -> Vec<S> {
    x.iter().zip(k).map(|(&xi, &ki)| xi + ki * h).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded(re: f64) -> Dual64 {
        Dual64::new(re, 1.0)
    }

    #[test]
    fn add_scaled_matches_manual() {
        let out = add_scaled(&[1.0, 2.0], &[3.0, -1.0], 0.5);
        assert_eq!(out, vec![2.5, 1.5]);
    }

    #[test]
    fn add_scaled_carries_derivative() {
        let out = add_scaled(&[seeded(1.0)], &[seeded(2.0)], 0.25);
        assert!((out[0].re - 1.5).abs() < 1e-15);
        assert!((out[0].eps - 1.25).abs() < 1e-15);
    }

    fn formula<S: Scalar>(v: S, n: i32) -> S {
        v.sin() * v.exp() + v.powi(n) / (v.cos() + 2.0)
    }

    proptest! {
        #[test]
        fn generic_formula_agrees_across_scalars(x in -3.0f64..3.0, n in 1i32..5) {
            let out = formula(seeded(x), n);
            let plain = formula(x, n);
            prop_assert!((out.re - plain).abs() < 1e-10);

            let h = 1e-6;
            let fd = (formula(x + h, n) - formula(x - h, n)) / (2.0 * h);
            prop_assert!((out.eps - fd).abs() < 1e-5 * (1.0 + fd.abs()));
        }
    }
}
