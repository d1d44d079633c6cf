use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Check every entry of a slice is finite.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), CoreError> {
    for &v in values {
        ensure_finite(v, what)?;
    }
    Ok(())
}

/// Check a vector has the expected length.
pub fn ensure_len(len: usize, expected: usize, what: &'static str) -> Result<(), CoreError> {
    if len != expected {
        return Err(CoreError::Dimension {
            what,
            expected,
            got: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_len_reports_both_sizes() {
        let err = ensure_len(3, 6, "x_0").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("x_0"));
        assert!(msg.contains("expected 6"));
        assert!(msg.contains("got 3"));
    }

    #[test]
    fn ensure_all_finite_names_the_vector() {
        assert!(ensure_all_finite(&[1.0, 2.0], "u").is_ok());
        let err = ensure_all_finite(&[1.0, Real::INFINITY], "u").unwrap_err();
        assert!(matches!(err, CoreError::NonFinite { what: "u", .. }));
    }
}
