//! Small dense linear solves over any [`Scalar`], dual numbers included.

use crate::error::{CoreError, CoreResult};
use crate::scalar::Scalar;

/// Solve `a * x = b` for a square row-major `a` by Gaussian elimination
/// with partial pivoting on the real part.
///
/// Used by models whose equations contain a mass-matrix inverse; going
/// through a solve keeps the formula valid for dual numbers.
pub fn linsolve<S: Scalar>(a: &[Vec<S>], b: &[S]) -> CoreResult<Vec<S>> {
    let n = b.len();
    if a.len() != n {
        return Err(CoreError::Dimension {
            what: "linsolve rows",
            expected: n,
            got: a.len(),
        });
    }
    let mut m: Vec<Vec<S>> = Vec::with_capacity(n);
    for (row, &rhs) in a.iter().zip(b) {
        if row.len() != n {
            return Err(CoreError::Dimension {
                what: "linsolve columns",
                expected: n,
                got: row.len(),
            });
        }
        let mut r = row.clone();
        r.push(rhs);
        m.push(r);
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[i][col].re().abs().total_cmp(&m[j][col].re().abs()))
            .unwrap_or(col);
        if m[pivot][col].re().abs() < 1e-300 {
            return Err(CoreError::Singular { what: "linsolve" });
        }
        m.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            for k in col..=n {
                let v = m[col][k];
                m[row][k] = m[row][k] - factor * v;
            }
        }
    }

    let mut x = vec![S::from(0.0); n];
    for row in (0..n).rev() {
        let mut acc = m[row][n];
        for k in (row + 1)..n {
            acc = acc - m[row][k] * x[k];
        }
        x[row] = acc / m[row][row];
    }
    Ok(x)
}
