//! Common numeric helpers shared by the field store, the derivation engine
//! and the URL codec.
//!
//! Display strings are always produced by [`format_amount`] and read back by
//! [`parse_display`]; for any non-negative value with at most two fraction
//! digits the pair round-trips exactly.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

/// Leading decimal number, the way a browser's `parseFloat` reads one.
static LEADING_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+))").expect("valid leading decimal pattern")
});

/// Leading integer, the way a browser's `parseInt` reads one.
static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("valid leading integer pattern"));

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use dscr_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    round_to(value, 2)
}

/// Rounds `value` to `scale` fraction digits, half away from zero.
pub fn round_to(
    value: Decimal,
    scale: u32,
) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats a value with a fixed number of fraction digits and comma
/// thousands separators (`1234567.8` → `"1,234,567.80"`).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use dscr_core::calculations::common::format_amount;
///
/// assert_eq!(format_amount(dec!(600000), 2), "600,000.00");
/// assert_eq!(format_amount(dec!(6.125), 3), "6.125");
/// assert_eq!(format_amount(dec!(0.005), 2), "0.01");
/// ```
pub fn format_amount(
    value: Decimal,
    scale: u32,
) -> String {
    let mut rounded = round_to(value, scale).abs();
    rounded.rescale(scale);
    let negative = value.is_sign_negative() && !rounded.is_zero();

    let text = rounded.to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// Formats a currency value for result output: `"$"` followed by
/// [`format_amount`] at two decimals.
pub fn format_currency_output(value: Decimal) -> String {
    format!("${}", format_amount(value, 2))
}

/// Parses a display string back into a number.
///
/// Every character that is not an ASCII digit or a decimal point is dropped,
/// then the longest leading number is read. Empty or unreadable input is 0;
/// this parser never fails.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use dscr_core::calculations::common::parse_display;
///
/// assert_eq!(parse_display("$1,234.56"), dec!(1234.56));
/// assert_eq!(parse_display("1.2.3"), dec!(1.2));
/// assert_eq!(parse_display("abc"), Decimal::ZERO);
/// ```
pub fn parse_display(input: &str) -> Decimal {
    let stripped: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    parse_leading_decimal(&stripped).unwrap_or(Decimal::ZERO)
}

/// Reads the longest leading decimal number of `input`.
///
/// Returns `None` when `input` does not start with a number or when the
/// number does not fit a [`Decimal`].
pub fn parse_leading_decimal(input: &str) -> Option<Decimal> {
    let captures = LEADING_DECIMAL.captures(input)?;
    let mut number = captures[1].to_string();
    if number.ends_with('.') {
        number.pop();
    }
    match number.parse::<Decimal>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(input = %input, "number out of range: {}", e);
            None
        }
    }
}

/// Reads the longest leading integer of `input` (`"3.7"` → 3).
pub fn parse_leading_integer(input: &str) -> Option<i64> {
    let captures = LEADING_INTEGER.captures(input)?;
    captures[1].parse().ok()
}

/// Divides, yielding `None` instead of panicking on a zero divisor.
pub fn checked_ratio(
    numerator: Decimal,
    denominator: Decimal,
) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
    }

    #[test]
    fn round_half_up_handles_large_values() {
        assert_eq!(round_half_up(dec!(999999.999)), dec!(1000000.00));
    }

    #[test]
    fn round_to_three_places() {
        assert_eq!(round_to(dec!(6.1254), 3), dec!(6.125));
        assert_eq!(round_to(dec!(6.1255), 3), dec!(6.126));
    }

    // =========================================================================
    // format_amount tests
    // =========================================================================

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(dec!(1234567.891), 2), "1,234,567.89");
        assert_eq!(format_amount(dec!(999), 2), "999.00");
        assert_eq!(format_amount(dec!(1000), 2), "1,000.00");
        assert_eq!(format_amount(dec!(100000), 2), "100,000.00");
    }

    #[test]
    fn format_amount_pads_fraction_digits() {
        assert_eq!(format_amount(dec!(25), 2), "25.00");
        assert_eq!(format_amount(dec!(0.3), 2), "0.30");
        assert_eq!(format_amount(dec!(6.13), 3), "6.130");
    }

    #[test]
    fn format_amount_handles_zero() {
        assert_eq!(format_amount(Decimal::ZERO, 2), "0.00");
        assert_eq!(format_amount(dec!(-0.001), 2), "0.00");
    }

    #[test]
    fn format_amount_keeps_sign_of_negative_values() {
        assert_eq!(format_amount(dec!(-1234.5), 2), "-1,234.50");
    }

    #[test]
    fn format_currency_output_prefixes_dollar_sign() {
        assert_eq!(format_currency_output(dec!(2734.2474)), "$2,734.25");
    }

    // =========================================================================
    // parse_display tests
    // =========================================================================

    #[test]
    fn parse_display_strips_separators_and_symbols() {
        assert_eq!(parse_display("600,000.00"), dec!(600000));
        assert_eq!(parse_display(" $3,500.00 "), dec!(3500));
        assert_eq!(parse_display("25%"), dec!(25));
    }

    #[test]
    fn parse_display_drops_minus_sign() {
        assert_eq!(parse_display("-150.00"), dec!(150));
    }

    #[test]
    fn parse_display_empty_or_garbage_is_zero() {
        assert_eq!(parse_display(""), Decimal::ZERO);
        assert_eq!(parse_display("."), Decimal::ZERO);
        assert_eq!(parse_display("n/a"), Decimal::ZERO);
    }

    #[test]
    fn parse_display_stops_at_second_decimal_point() {
        assert_eq!(parse_display("1.2.3"), dec!(1.2));
    }

    #[test]
    fn parse_display_overflow_is_zero() {
        assert_eq!(parse_display("999999999999999999999999999999999"), Decimal::ZERO);
    }

    #[test]
    fn parse_of_format_round_trips_to_two_places() {
        for value in [
            dec!(0),
            dec!(0.01),
            dec!(0.5),
            dec!(7.25),
            dec!(999.99),
            dec!(1000),
            dec!(3500.00),
            dec!(123456789.12),
        ] {
            assert_eq!(parse_display(&format_amount(value, 2)), round_half_up(value));
        }
    }

    #[test]
    fn parse_of_format_rounds_extra_digits() {
        assert_eq!(parse_display(&format_amount(dec!(2.345), 2)), dec!(2.35));
    }

    // =========================================================================
    // leading number tests
    // =========================================================================

    #[test]
    fn parse_leading_decimal_reads_prefix() {
        assert_eq!(parse_leading_decimal("12abc"), Some(dec!(12)));
        assert_eq!(parse_leading_decimal("  6.125"), Some(dec!(6.125)));
        assert_eq!(parse_leading_decimal(".5"), Some(dec!(0.5)));
        assert_eq!(parse_leading_decimal("7."), Some(dec!(7)));
        assert_eq!(parse_leading_decimal("-3"), Some(dec!(-3)));
        assert_eq!(parse_leading_decimal("abc"), None);
        assert_eq!(parse_leading_decimal(""), None);
    }

    #[test]
    fn parse_leading_integer_truncates_fraction() {
        assert_eq!(parse_leading_integer("3.7"), Some(3));
        assert_eq!(parse_leading_integer("30years"), Some(30));
        assert_eq!(parse_leading_integer("-2"), Some(-2));
        assert_eq!(parse_leading_integer("abc"), None);
    }

    #[test]
    fn checked_ratio_guards_zero_divisor() {
        assert_eq!(checked_ratio(dec!(1), Decimal::ZERO), None);
        assert_eq!(checked_ratio(dec!(1), dec!(4)), Some(dec!(0.25)));
    }
}
