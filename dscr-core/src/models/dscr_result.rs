use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Qualitative band of a DSCR value, derived from fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageSeverity {
    Excellent,
    Good,
    Warning,
    Danger,
}

impl MessageSeverity {
    /// `>= 1.25` Excellent, `>= 1.0` Good, `>= 0.75` Warning, otherwise Danger.
    pub fn from_ratio(dscr: Decimal) -> Self {
        if dscr >= dec!(1.25) {
            Self::Excellent
        } else if dscr >= dec!(1.0) {
            Self::Good
        } else if dscr >= dec!(0.75) {
            Self::Warning
        } else {
            Self::Danger
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// Output of one DSCR calculation. Values are unrounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscrResult {
    pub monthly_mortgage_payment: Decimal,
    pub monthly_taxes: Decimal,
    pub monthly_insurance: Decimal,
    pub hoa_fees_monthly: Decimal,
    /// Payment + taxes + insurance + HOA.
    pub total_monthly_expenses: Decimal,
    pub rental_income: Decimal,
    /// Rental income over total expenses; 0 when expenses are 0.
    pub dscr_value: Decimal,
    pub message: String,
    pub message_severity: MessageSeverity,
}
