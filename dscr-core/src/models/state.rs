use serde::{Deserialize, Serialize};

use super::{Escrow, LoanInputs, LoanTerms, RentalIncome};

/// Every input of the calculator for one session.
///
/// `Default` yields the seed values the calculator starts with before any
/// defaults provider or URL parameters are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub loan: LoanInputs,
    pub rental: RentalIncome,
    pub terms: LoanTerms,
    pub escrow: Escrow,
}
