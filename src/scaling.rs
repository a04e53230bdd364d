//! Linear remapping between numeric ranges.
//!
//! Every range mismatch in the simulator funnels through [`scale`], so the
//! clamping policy lives in exactly one place.

use crate::model::{BoktaiError, Result};

/// Remaps `value` from `[old_min, old_max]` onto `[new_min, new_max]`.
///
/// A `value` above `old_max` widens the source range to end at `value`, so
/// out-of-range-high input never fails and maps to `new_max`. A `value` below
/// `old_min`, or a target range with `new_min >= new_max`, is a
/// [`BoktaiError::Range`].
///
/// A zero-width source range (only possible when `value == old_min ==
/// old_max`) has no meaningful position and maps to the middle of the target
/// range.
pub fn scale(old_min: f64, old_max: f64, new_min: f64, new_max: f64, value: f64) -> Result<f64> {
    let old_max = if value > old_max { value } else { old_max };

    // Written negated so NaN inputs fail the precondition too.
    if !(old_min <= value && value <= old_max) {
        return Err(BoktaiError::Range(format!(
            "value {} outside source range [{}, {}]",
            value, old_min, old_max
        )));
    }
    if !(new_min < new_max) {
        return Err(BoktaiError::Range(format!(
            "target range [{}, {}] is empty",
            new_min, new_max
        )));
    }

    let old_range = old_max - old_min;
    let new_range = new_max - new_min;
    if old_range == 0.0 {
        return Ok(new_min + new_range / 2.0);
    }
    Ok(((value - old_min) / old_range) * new_range + new_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_midpoint_maps_to_midpoint() {
        assert_relative_eq!(scale(0.0, 10.0, 0.0, 100.0, 5.0).unwrap(), 50.0);
    }

    #[test]
    fn test_temperature_to_gauge_range() {
        let v = scale(0.0, 35.0, 0.0, 10.0, 12.0).unwrap();
        assert_relative_eq!(v, 3.428_571, epsilon = 1e-5);
        let w = scale(0.0, 35.0, 4.0, 10.0, 12.0).unwrap();
        assert_relative_eq!(w, 6.057_142, epsilon = 1e-5);
    }

    #[test]
    fn test_value_above_old_max_widens_range() {
        assert_relative_eq!(scale(0.0, 10.0, 0.0, 8.0, 25.0).unwrap(), 8.0);
    }

    #[test]
    fn test_value_below_old_min_is_range_error() {
        let err = scale(0.0, 10.0, 0.0, 8.0, -0.5).unwrap_err();
        assert!(matches!(err, BoktaiError::Range(_)), "got {:?}", err);
    }

    #[test]
    fn test_empty_target_range_is_range_error() {
        assert!(scale(0.0, 10.0, 5.0, 5.0, 1.0).is_err());
        assert!(scale(0.0, 10.0, 6.0, 5.0, 1.0).is_err());
    }

    #[test]
    fn test_nan_is_range_error() {
        assert!(scale(0.0, 10.0, 0.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_zero_width_source_maps_to_target_midpoint() {
        assert_relative_eq!(scale(20.0, 20.0, 0.0, 10.0, 20.0).unwrap(), 5.0);
    }

    #[test]
    fn test_output_stays_in_target_range_and_inverts() {
        let (old_min, old_max, new_min, new_max) = (-12.0, 31.5, 2.0, 10.0);
        let mut v = old_min;
        while v <= old_max {
            let scaled = scale(old_min, old_max, new_min, new_max, v).unwrap();
            assert!((new_min..=new_max).contains(&scaled), "{} escaped to {}", v, scaled);
            let back = scale(new_min, new_max, old_min, old_max, scaled).unwrap();
            assert_relative_eq!(back, v, epsilon = 1e-9);
            v += 0.75;
        }
    }
}
