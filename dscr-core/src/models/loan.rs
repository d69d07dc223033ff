use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{EntryMode, Field};

/// Purchase (or refinance) figures and the loan they imply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanInputs {
    /// Purchase price, or appraised value for a refinance.
    pub property_value: Field,
    /// Only changes the property value label.
    pub is_refi: bool,
    pub down_payment_mode: EntryMode,
    /// 0 to 100.
    pub down_payment_percent: Field,
    /// Never above `property_value`.
    pub down_payment_amount: Field,
    /// `property_value - down_payment_amount`.
    pub loan_amount: Field,
}

impl LoanInputs {
    /// Label shown next to the property value.
    pub fn property_value_label(&self) -> &'static str {
        if self.is_refi {
            "Appraised Value"
        } else {
            "Purchase Price"
        }
    }
}

impl Default for LoanInputs {
    fn default() -> Self {
        Self {
            property_value: Field::new(dec!(600000)),
            is_refi: false,
            down_payment_mode: EntryMode::Percent,
            down_payment_percent: Field::new(dec!(25)),
            down_payment_amount: Field::new(dec!(150000)),
            loan_amount: Field::new(dec!(450000)),
        }
    }
}
