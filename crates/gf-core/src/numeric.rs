use crate::GfError;

/// Floating point type used throughout the system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, GfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(GfError::NonFinite { what, value: v })
    }
}

/// Strictly positive and finite.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, GfError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(GfError::InvalidArg { what })
    }
}

/// Infinity norm of a slice (0 for an empty slice).
pub fn inf_norm(values: &[Real]) -> Real {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn inf_norm_bounds_every_entry(values in prop::collection::vec(-1e6_f64..1e6_f64, 0..16)) {
            let n = inf_norm(&values);
            for v in &values {
                prop_assert!(v.abs() <= n);
            }
        }
    }
}
