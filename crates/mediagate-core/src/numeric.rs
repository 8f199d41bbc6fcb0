//! Number parsing and display helpers.
//!
//! Requirement catalogs are hand-authored, so numbers arrive as JSON numbers
//! or as loosely formatted strings (`"5"`, `"5MB"`, `" 0.32 "`).

/// Decimal places every displayed measurement is rounded to.
pub const DISPLAY_PLACES: u32 = 2;

/// Digits the value is fixed at before half-up rounding.
const FIXED_PLACES: u32 = 5;

/// Digits that show an `f64` ratio's binary value exactly enough to tell
/// which side of a two-place midpoint it falls on.
const EXACT_PLACES: u32 = 25;

/// Round half-up in decimal, not binary.
///
/// The value is first fixed at 5 decimals and the rounding is done on that
/// decimal string, so `1.005` becomes `1.01` even though its binary form is
/// slightly below the midpoint.
pub fn round_half_up(value: f64, places: u32) -> f64 {
    round_fixed(value, FIXED_PLACES, places)
}

/// Round half-up on the exact binary value, like `Number.toFixed`:
/// `1.005` is stored as `1.00499...` and becomes `1.0`.
pub fn round_binary(value: f64, places: u32) -> f64 {
    round_fixed(value, EXACT_PLACES, places)
}

fn round_fixed(value: f64, fixed_places: u32, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let places = places.min(fixed_places);
    let fixed = format!("{:.*}", fixed_places as usize, value.abs());
    let digits: String = fixed.chars().filter(|c| *c != '.').collect();
    let Ok(scaled) = digits.parse::<u128>() else {
        return value;
    };

    let divisor = 10u128.pow(fixed_places - places);
    let mut quotient = scaled / divisor;
    if (scaled % divisor) * 2 >= divisor {
        quotient += 1;
    }

    let rounded = quotient as f64 / 10f64.powi(places as i32);
    if value.is_sign_negative() && rounded != 0.0 {
        -rounded
    } else {
        rounded
    }
}

/// Round to [`DISPLAY_PLACES`].
pub fn round2(value: f64) -> f64 {
    round_half_up(value, DISPLAY_PLACES)
}

/// Shortest human form of a number: `5`, `0.032`, `1.78`.
pub fn fmt_num(value: f64) -> String {
    if value == 0.0 {
        // Covers -0.0 too.
        return "0".to_string();
    }
    format!("{}", value)
}

/// Lenient float parsing for authored values.
///
/// Leading whitespace is skipped and the longest numeric prefix wins, so
/// `"5MB"` parses as `5`. Returns `None` when no prefix is numeric.
pub fn parse_leading_f64(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let candidate_len = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;

    (1..=candidate_len)
        .rev()
        .filter_map(|end| trimmed.get(..end))
        .find_map(|prefix| prefix.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_half_up_decimal_midpoints() {
        assert_eq!(round_half_up(1.005, 2), 1.01);
        assert_eq!(round_half_up(2.675, 2), 2.68);
        assert_eq!(round_half_up(1.777777, 2), 1.78);
        assert_eq!(round_half_up(0.5625, 2), 0.56);
        assert_eq!(round_half_up(29.97, 0), 30.0);
        assert_eq!(round_half_up(29.5, 0), 30.0);
    }

    #[test]
    fn round_half_up_negative_and_zero() {
        assert_eq!(round_half_up(-1.005, 2), -1.01);
        assert_eq!(round_half_up(0.0, 2), 0.0);
        assert_eq!(round_half_up(-0.001, 2), 0.0);
    }

    #[test]
    fn round_half_up_non_finite_passthrough() {
        assert!(round_half_up(f64::NAN, 2).is_nan());
        assert_eq!(round_half_up(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn round_binary_follows_stored_value() {
        assert_eq!(round_binary(1.005, 2), 1.0);
        assert_eq!(round_binary(201.0 / 200.0, 2), 1.0);
        assert_eq!(round_binary(1.125, 2), 1.13);
        assert_eq!(round_binary(16.0 / 9.0, 2), 1.78);
        assert_eq!(round_binary(-0.375, 2), -0.38);
        assert!(round_binary(f64::NAN, 2).is_nan());
    }

    #[test]
    fn fmt_num_shortest_form() {
        assert_eq!(fmt_num(5.0), "5");
        assert_eq!(fmt_num(0.032), "0.032");
        assert_eq!(fmt_num(1.78), "1.78");
        assert_eq!(fmt_num(-0.0), "0");
        assert_eq!(fmt_num(1920.0), "1920");
    }

    #[test]
    fn parse_leading_f64_lenient() {
        assert_eq!(parse_leading_f64("5"), Some(5.0));
        assert_eq!(parse_leading_f64(" 0.32 "), Some(0.32));
        assert_eq!(parse_leading_f64("5MB"), Some(5.0));
        assert_eq!(parse_leading_f64("1e3"), Some(1000.0));
        assert_eq!(parse_leading_f64("12.5.3"), Some(12.5));
        assert_eq!(parse_leading_f64("abc"), None);
        assert_eq!(parse_leading_f64(""), None);
    }
}
