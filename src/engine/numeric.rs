//! Numeric sanitising shared by the evaluators.

/// Collapse `NaN` and infinities to `0`.
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `count * per_unit`, clamped to a finite value.
#[inline]
pub fn scaled(count: f64, per_unit: f64) -> f64 {
    finite_or_zero(finite_or_zero(count) * finite_or_zero(per_unit))
}

/// Add `term` to `total`, dropping the term when it is non-finite or when
/// the sum would leave the finite range.
#[inline]
pub fn accumulate(total: f64, term: f64) -> f64 {
    let next = total + finite_or_zero(term);
    if next.is_finite() {
        next
    } else {
        total
    }
}

/// True when any of `values` would have been clamped.
pub fn any_non_finite(values: &[f64]) -> bool {
    values.iter().any(|v| !v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(3.5), 3.5);
        assert_eq!(finite_or_zero(-2.0), -2.0);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_scaled_clamps_overflow() {
        assert_eq!(scaled(4.0, 2.5), 10.0);
        assert_eq!(scaled(f64::MAX, 10.0), 0.0);
        assert_eq!(scaled(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn test_accumulate_drops_overflowing_term() {
        assert_eq!(accumulate(1.5, 2.0), 3.5);
        assert_eq!(accumulate(1.0, f64::NAN), 1.0);
        assert_eq!(accumulate(f64::MAX, f64::MAX), f64::MAX);
        assert_eq!(accumulate(-f64::MAX, -f64::MAX), -f64::MAX);
    }

    #[test]
    fn test_any_non_finite() {
        assert!(!any_non_finite(&[0.0, 1.0, -4.0]));
        assert!(any_non_finite(&[0.0, f64::NAN]));
    }
}
