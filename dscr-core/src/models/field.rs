use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{format_amount, parse_display, round_to};

/// Fraction digits kept by currency and percent fields.
pub const DISPLAY_SCALE: u32 = 2;

/// Fraction digits kept by the interest rate field.
pub const RATE_SCALE: u32 = 3;

/// A numeric input field: a canonical decimal value plus its display string.
///
/// The value is always rounded to the field's scale, and the display string
/// is always `format_amount(value, scale)`, so either side can be derived
/// from the other without loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    value: Decimal,
    display: String,
    scale: u32,
}

impl Field {
    /// A two-decimal field holding `value`.
    pub fn new(value: Decimal) -> Self {
        Self::with_scale(value, DISPLAY_SCALE)
    }

    /// A field holding `value` rounded to `scale` fraction digits.
    pub fn with_scale(
        value: Decimal,
        scale: u32,
    ) -> Self {
        let value = round_to(value, scale);
        Self {
            display: format_amount(value, scale),
            value,
            scale,
        }
    }

    /// A two-decimal field read from user text. Unreadable text yields 0.
    pub fn parse(input: &str) -> Self {
        Self::new(parse_display(input))
    }

    /// A field read from user text at the given scale.
    pub fn parse_with_scale(
        input: &str,
        scale: u32,
    ) -> Self {
        Self::with_scale(parse_display(input), scale)
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Replaces the value, keeping this field's scale.
    pub fn set(
        &mut self,
        value: Decimal,
    ) {
        *self = Self::with_scale(value, self.scale);
    }

    /// Replaces the value from user text, keeping this field's scale.
    pub fn set_text(
        &mut self,
        input: &str,
    ) {
        self.set(parse_display(input));
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Field {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.display)
    }
}
