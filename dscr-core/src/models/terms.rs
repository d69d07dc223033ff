use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{Field, RATE_SCALE};

/// Rate and term of the loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Annual nominal rate in percent, kept to three decimals.
    pub interest_rate: Field,
    pub term_years: u32,
    pub is_interest_only: bool,
}

impl LoanTerms {
    pub fn term_months(&self) -> u64 {
        u64::from(self.term_years) * 12
    }
}

impl Default for LoanTerms {
    fn default() -> Self {
        Self {
            interest_rate: Field::with_scale(dec!(6.125), RATE_SCALE),
            term_years: 30,
            is_interest_only: false,
        }
    }
}
