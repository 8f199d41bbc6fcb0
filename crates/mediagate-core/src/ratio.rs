//! Aspect-ratio classification and interval membership.

use crate::models::MetaValue;
use crate::numeric::{parse_leading_f64, round2, round_binary};

/// Labels a file's ratio may snap to, with the fraction they stand for.
const COMMON_RATIOS: [(&str, f64, f64); 8] = [
    ("1:1", 1.0, 1.0),
    ("4:5", 4.0, 5.0),
    ("5:4", 5.0, 4.0),
    ("16:9", 16.0, 9.0),
    ("9:16", 9.0, 16.0),
    ("3:2", 3.0, 2.0),
    ("2:3", 2.0, 3.0),
    // Facebook / Instagram landscape
    ("1.91:1", 1.91, 1.0),
];

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Classify `width x height` to the nearest common label.
///
/// The decimal ratio (2 places) is compared against each common ratio (also
/// 2 places). A table entry only wins when it is strictly closer than the
/// reduced fraction itself, and earlier entries win ties. Otherwise the
/// reduced fraction (`"4:3"`, `"21:9"`, ...) is the label.
pub fn classify(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return format!("{}:{}", width, height);
    }

    let divisor = gcd(width, height);
    let (rw, rh) = (width / divisor, height / divisor);
    // Classification rounds the stored binary value; interval checks use round2.
    let decimal = round_binary(width as f64 / height as f64, 2);

    let mut closest = format!("{}:{}", rw, rh);
    let mut closest_diff = (decimal - rw as f64 / rh as f64).abs();

    for (label, num, den) in COMMON_RATIOS {
        let diff = (decimal - round_binary(num / den, 2)).abs();
        if diff < closest_diff {
            closest = label.to_string();
            closest_diff = diff;
        }
    }

    closest
}

/// Decimal value of an interval bound: a number, `"N:D"` or a decimal string.
pub fn ratio_bound(value: &MetaValue) -> Option<f64> {
    match value {
        MetaValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        MetaValue::Text(text) => match text.split_once(':') {
            Some((num, den)) => {
                let num: f64 = num.trim().parse().ok()?;
                let den: f64 = den.trim().parse().ok()?;
                if den == 0.0 {
                    return None;
                }
                Some(num / den).filter(|r| r.is_finite())
            }
            None => parse_leading_f64(text),
        },
    }
}

/// Round half toward positive infinity, like a browser's `Math.round`.
fn round_to_int(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Whether `width / height` lies in the closed interval spanned by two bounds.
///
/// Dimensions are rounded to whole pixels and made positive; a zero side is
/// never in range. Bounds may come in either order and are rounded to 2
/// places, as is the actual ratio. Unparsable bounds are never satisfied.
pub fn in_range(width: f64, height: f64, bound_a: &MetaValue, bound_b: &MetaValue) -> bool {
    let width = round_to_int(width).abs();
    let height = round_to_int(height).abs();
    if width == 0.0 || height == 0.0 || !width.is_finite() || !height.is_finite() {
        return false;
    }

    let (Some(a), Some(b)) = (ratio_bound(bound_a), ratio_bound(bound_b)) else {
        return false;
    };

    let actual = round2(width / height);
    let min = round2(a.min(b));
    let max = round2(a.max(b));
    actual >= min && actual <= max
}
