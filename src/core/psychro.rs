// Psychrometric helpers (volumetric absolute humidity in g/m³)

use crate::core::constants::*;

/// Default tolerance for [`calc_t_from_vh`]; plenty for guide lines.
pub const DEFAULT_EPS: f64 = 0.5;

/// Absolute humidity [g/m³] from temperature [°C] and relative humidity [%].
pub fn calc_vh(t: f64, rh: f64) -> f64 {
    13.253926 * 10f64.powf((7.5 * t) / (237.3 + t)) * rh / (t + 273.15)
}

// Enough halvings to shrink the chart range below f64 resolution.
const MAX_BISECT: usize = 64;

/// Temperature at which `rh` yields absolute humidity `vh`, by bisection over
/// the chart range. Returns the midpoint once the bracket is narrower than
/// `eps`; a non-positive or NaN `eps` runs to the iteration cap.
pub fn calc_t_from_vh(vh: f64, rh: f64, eps: f64) -> f64 {
    let mut lo = PC_X_BEGIN;
    let mut hi = PC_X_END;
    for _ in 0..MAX_BISECT {
        if hi - lo < eps {
            break;
        }
        let mid = (lo + hi) / 2.0;
        if calc_vh(mid, rh) > vh {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Comfortable absolute-humidity band at temperature `t`, if `t` is inside
/// the comfort temperature range.
pub fn comfort_band(t: f64) -> Option<(f64, f64)> {
    if !(PC_ZONE_TMIN..=PC_ZONE_TMAX).contains(&t) {
        return None;
    }
    Some((
        calc_vh(t, PC_ZONE_RMIN).max(PC_ZONE_VMIN),
        calc_vh(t, PC_ZONE_RMAX).min(PC_ZONE_VMAX),
    ))
}

pub fn in_comfort_zone(t: f64, rh: f64) -> bool {
    let vh = calc_vh(t, rh);
    (PC_ZONE_RMIN..=PC_ZONE_RMAX).contains(&rh)
        && comfort_band(t).is_some_and(|(lo, hi)| (lo..=hi).contains(&vh))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_vh_at_25c_50pct() {
        let expected = 13.253926 * 10f64.powf(187.5 / 262.3) * 50.0 / 298.15;
        assert_abs_diff_eq!(calc_vh(25.0, 50.0), expected, epsilon = 1e-6);
        // roughly 11.5 g/m³
        assert_abs_diff_eq!(calc_vh(25.0, 50.0), 11.53, epsilon = 0.05);
    }

    #[test]
    fn test_inverse_recovers_temperature() {
        let vh = calc_vh(25.0, 50.0);
        assert_abs_diff_eq!(calc_t_from_vh(vh, 50.0, DEFAULT_EPS), 25.0, epsilon = DEFAULT_EPS);
        assert_abs_diff_eq!(calc_t_from_vh(vh, 50.0, 1e-6), 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_terminates_without_tolerance() {
        let vh = calc_vh(25.0, 50.0);
        assert_abs_diff_eq!(calc_t_from_vh(vh, 50.0, 0.0), 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(calc_t_from_vh(vh, 50.0, -1.0), 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(calc_t_from_vh(vh, 50.0, f64::NAN), 25.0, epsilon = 1e-9);
        let t = calc_t_from_vh(f64::NAN, 50.0, 0.0);
        assert!((PC_X_BEGIN..=PC_X_END).contains(&t));
    }

    #[test]
    fn test_vh_zero_humidity() {
        assert_eq!(calc_vh(20.0, 0.0), 0.0);
    }

    #[test]
    fn test_comfort_zone() {
        assert!(in_comfort_zone(23.0, 50.0));
        assert!(!in_comfort_zone(18.0, 50.0));
        assert!(!in_comfort_zone(23.0, 70.0));
        // 26°C at 60% is above the 14 g/m³ ceiling
        assert!(calc_vh(26.0, 60.0) > PC_ZONE_VMAX);
        assert!(!in_comfort_zone(26.0, 60.0));
        assert!(comfort_band(30.0).is_none());
        let (lo, hi) = comfort_band(22.0).unwrap();
        assert!(lo >= PC_ZONE_VMIN && hi <= PC_ZONE_VMAX && lo < hi);
    }
}
