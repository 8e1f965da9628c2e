//! Checked numeric conversions between window indices and sample values

use crate::{Error, Result};

/// Convert a sample count or index to `f64`
///
/// Window sizes are far below 2^52, so the conversion is exact in practice.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Counts never approach 2^52
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Convert a parsed floating point window parameter into a count
///
/// # Errors
///
/// Returns an error if the value is not finite, negative, or has a fractional part
#[allow(clippy::cast_possible_truncation)] // Checked to be integral and in range
#[allow(clippy::cast_sign_loss)] // Checked to be non-negative
pub fn f64_to_usize(value: f64) -> Result<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= usize_to_f64(usize::MAX) {
        Ok(value as usize)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to usize"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_usize_to_f64() {
        assert_eq!(usize_to_f64(0), 0.0);
        assert_eq!(usize_to_f64(42), 42.0);
    }

    #[test]
    fn test_f64_to_usize() {
        assert_eq!(f64_to_usize(42.0).unwrap(), 42);
        assert_eq!(f64_to_usize(0.0).unwrap(), 0);

        assert!(f64_to_usize(-1.0).is_err());
        assert!(f64_to_usize(1.5).is_err());
        assert!(f64_to_usize(f64::NAN).is_err());
        assert!(f64_to_usize(f64::INFINITY).is_err());
    }

    proptest! {
        #[test]
        fn prop_round_trip(value in 0usize..1_000_000) {
            prop_assert_eq!(f64_to_usize(usize_to_f64(value)).unwrap(), value);
        }
    }
}
