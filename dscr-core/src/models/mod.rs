mod dscr_result;
mod escrow;
mod field;
mod loan;
mod message_rule;
mod modes;
mod rental;
mod state;
mod terms;

pub use dscr_result::{DscrResult, MessageSeverity};
pub use escrow::{Escrow, EscrowLine};
pub use field::{DISPLAY_SCALE, Field, RATE_SCALE};
pub use loan::LoanInputs;
pub use message_rule::{
    DscrMessageRule, MessageRuleError, NO_MATCHING_RANGE_MESSAGE, fallback_message_rules,
    validate_message_rules,
};
pub use modes::{EntryMode, IncomeMode};
pub use rental::{MAX_UNITS, MIN_UNITS, RentalIncome, seed_unit_income};
pub use state::FieldState;
pub use terms::LoanTerms;
