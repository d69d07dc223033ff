use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{EntryMode, Field};

/// An annual escrow cost expressed both as a percent of property value and
/// as an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowLine {
    pub mode: EntryMode,
    pub percent: Field,
    /// Annual amount.
    pub amount: Field,
}

impl EscrowLine {
    pub fn new(
        percent: Field,
        amount: Field,
    ) -> Self {
        Self {
            mode: EntryMode::Percent,
            percent,
            amount,
        }
    }
}

/// Property taxes, insurance and HOA dues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub taxes: EscrowLine,
    pub insurance: EscrowLine,
    /// Monthly; empty input counts as 0.
    pub hoa_fees_monthly: Field,
}

impl Default for Escrow {
    fn default() -> Self {
        Self {
            taxes: EscrowLine::new(Field::new(dec!(1.25)), Field::new(dec!(7500))),
            insurance: EscrowLine::new(Field::new(dec!(0.35)), Field::new(dec!(2100))),
            hoa_fees_monthly: Field::zero(),
        }
    }
}
