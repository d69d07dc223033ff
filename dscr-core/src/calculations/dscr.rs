//! Debt service coverage ratio calculation.
//!
//! The calculation steps:
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Term in months: term years × 12 |
//! | 2    | Monthly payment, interest-only or amortized |
//! | 3    | Monthly taxes and insurance: annual amounts ÷ 12 |
//! | 4    | Total expenses: payment + taxes + insurance + HOA |
//! | 5    | DSCR: rental income ÷ total expenses (0 when expenses are 0) |
//! | 6    | Message: first rule whose range contains the DSCR |
//!
//! The severity of the result comes from fixed thresholds (see
//! [`MessageSeverity::from_ratio`]) and does not depend on which rule
//! matched. When no rule matches, the message is
//! [`NO_MATCHING_RANGE_MESSAGE`] and the severity is `Warning`.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use dscr_core::calculations::DscrCalculator;
//! use dscr_core::models::{FieldState, MessageSeverity, fallback_message_rules};
//!
//! let state = FieldState::default();
//! let rules = fallback_message_rules();
//!
//! let result = DscrCalculator::new(&rules).calculate(
//!     &state.loan,
//!     &state.rental,
//!     &state.terms,
//!     &state.escrow,
//! );
//!
//! assert_eq!(result.monthly_mortgage_payment.round_dp(2), dec!(2734.25));
//! assert_eq!(result.total_monthly_expenses.round_dp(2), dec!(3534.25));
//! assert_eq!(result.message_severity, MessageSeverity::Warning);
//! ```

use rust_decimal::{Decimal, MathematicalOps};
use tracing::{debug, warn};

use crate::models::{
    DscrMessageRule, DscrResult, Escrow, LoanInputs, LoanTerms, MessageSeverity,
    NO_MATCHING_RANGE_MESSAGE, RentalIncome,
};

const MONTHS_PER_YEAR: u32 = 12;

/// Computes a [`DscrResult`] against a borrowed set of message rules.
///
/// The calculator holds no other state; calling [`calculate`] twice with the
/// same inputs yields the same result.
///
/// [`calculate`]: DscrCalculator::calculate
#[derive(Debug, Clone, Copy)]
pub struct DscrCalculator<'a> {
    rules: &'a [DscrMessageRule],
}

impl<'a> DscrCalculator<'a> {
    pub fn new(rules: &'a [DscrMessageRule]) -> Self {
        Self { rules }
    }

    pub fn calculate(
        &self,
        loan: &LoanInputs,
        rental: &RentalIncome,
        terms: &LoanTerms,
        escrow: &Escrow,
    ) -> DscrResult {
        let loan_amount = loan.loan_amount.value();
        let annual_rate = terms.interest_rate.value() / Decimal::ONE_HUNDRED;

        let payment = if terms.is_interest_only {
            interest_only_payment(loan_amount, annual_rate)
        } else {
            let monthly_rate = annual_rate / Decimal::from(MONTHS_PER_YEAR);
            monthly_payment(loan_amount, monthly_rate, terms.term_months())
        };

        let months = Decimal::from(MONTHS_PER_YEAR);
        let monthly_taxes = escrow.taxes.amount.value() / months;
        let monthly_insurance = escrow.insurance.amount.value() / months;
        let hoa_fees_monthly = escrow.hoa_fees_monthly.value();
        let total_monthly_expenses =
            total_expenses(&[payment, monthly_taxes, monthly_insurance, hoa_fees_monthly]);

        let rental_income = rental.total_rental_income.value();
        let dscr_value = self.dscr_value(rental_income, total_monthly_expenses);
        let (message, message_severity) = self.classify(dscr_value);

        debug!(
            payment = %payment,
            total_expenses = %total_monthly_expenses,
            dscr = %dscr_value,
            severity = message_severity.as_str(),
            "dscr calculated"
        );

        DscrResult {
            monthly_mortgage_payment: payment,
            monthly_taxes,
            monthly_insurance,
            hoa_fees_monthly,
            total_monthly_expenses,
            rental_income,
            dscr_value,
            message,
            message_severity,
        }
    }

    fn dscr_value(
        &self,
        rental_income: Decimal,
        total_monthly_expenses: Decimal,
    ) -> Decimal {
        if total_monthly_expenses <= Decimal::ZERO {
            warn!(
                total_expenses = %total_monthly_expenses,
                "total monthly expenses not positive; DSCR set to 0"
            );
            return Decimal::ZERO;
        }
        rental_income
            .checked_div(total_monthly_expenses)
            .unwrap_or(Decimal::ZERO)
    }

    fn classify(
        &self,
        dscr_value: Decimal,
    ) -> (String, MessageSeverity) {
        match self.rules.iter().find(|rule| rule.contains(dscr_value)) {
            Some(rule) => (rule.message.clone(), MessageSeverity::from_ratio(dscr_value)),
            None => {
                debug!(dscr = %dscr_value, "no message rule covers DSCR");
                (NO_MATCHING_RANGE_MESSAGE.to_string(), MessageSeverity::Warning)
            }
        }
    }
}

/// Sum of the monthly expenses, saturating at [`Decimal::MAX`].
fn total_expenses(parts: &[Decimal]) -> Decimal {
    parts
        .iter()
        .try_fold(Decimal::ZERO, |sum, part| sum.checked_add(*part))
        .unwrap_or_else(|| {
            warn!("total monthly expenses overflow; saturated");
            Decimal::MAX
        })
}

fn interest_only_payment(
    loan_amount: Decimal,
    annual_rate: Decimal,
) -> Decimal {
    loan_amount
        .checked_mul(annual_rate)
        .map(|interest| interest / Decimal::from(MONTHS_PER_YEAR))
        .unwrap_or_else(|| {
            warn!(loan_amount = %loan_amount, "interest-only payment overflow; saturated");
            Decimal::MAX
        })
}

/// Level monthly payment that repays `principal` over `term_months` at the
/// monthly rate `monthly_rate`.
///
/// A zero rate amortizes straight-line. A zero term, or a degenerate
/// denominator, yields 0. A compound factor too large for a [`Decimal`]
/// yields the limit payment `principal * monthly_rate`, which saturates at
/// [`Decimal::MAX`].
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use dscr_core::calculations::monthly_payment;
///
/// assert_eq!(monthly_payment(dec!(360000), Decimal::ZERO, 360), dec!(1000));
/// let payment = monthly_payment(dec!(450000), dec!(0.06125) / dec!(12), 360);
/// assert_eq!(payment.round_dp(2), dec!(2734.25));
/// ```
pub fn monthly_payment(
    principal: Decimal,
    monthly_rate: Decimal,
    term_months: u64,
) -> Decimal {
    if term_months == 0 {
        warn!("loan term is zero months; payment set to 0");
        return Decimal::ZERO;
    }

    if monthly_rate.is_zero() {
        return principal / Decimal::from(term_months);
    }

    let limit_payment = || principal.checked_mul(monthly_rate).unwrap_or(Decimal::MAX);

    let Some(compound) = (Decimal::ONE + monthly_rate).checked_powu(term_months) else {
        warn!(
            term_months,
            rate = %monthly_rate,
            "compound factor overflow; using interest-only limit"
        );
        return limit_payment();
    };

    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        warn!(rate = %monthly_rate, "payment denominator is zero; payment set to 0");
        return Decimal::ZERO;
    }

    principal
        .checked_mul(monthly_rate)
        .and_then(|interest| interest.checked_mul(compound))
        .and_then(|numerator| numerator.checked_div(denominator))
        .unwrap_or_else(|| {
            warn!(term_months, rate = %monthly_rate, "payment overflow; using interest-only limit");
            limit_payment()
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{Field, FieldState, IncomeMode, fallback_message_rules};

    fn assert_close(
        actual: Decimal,
        expected: Decimal,
        tolerance: Decimal,
    ) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    fn calculate(
        state: &FieldState,
        rules: &[DscrMessageRule],
    ) -> DscrResult {
        DscrCalculator::new(rules).calculate(
            &state.loan,
            &state.rental,
            &state.terms,
            &state.escrow,
        )
    }

    // =========================================================================
    // monthly_payment tests
    // =========================================================================

    #[test]
    fn zero_rate_is_straight_line() {
        assert_eq!(monthly_payment(dec!(450000), Decimal::ZERO, 360), dec!(1250));
        assert_eq!(
            monthly_payment(dec!(100000), Decimal::ZERO, 7),
            dec!(100000) / dec!(7)
        );
    }

    #[test]
    fn zero_term_yields_zero_payment() {
        assert_eq!(monthly_payment(dec!(450000), dec!(0.005), 0), Decimal::ZERO);
        assert_eq!(monthly_payment(dec!(450000), Decimal::ZERO, 0), Decimal::ZERO);
    }

    #[test]
    fn amortized_payment_matches_reference() {
        let payment = monthly_payment(dec!(450000), dec!(0.06125) / dec!(12), 360);

        assert_close(payment, dec!(2734.2474), dec!(0.001));
    }

    #[test]
    fn single_month_term_repays_principal_with_interest() {
        let payment = monthly_payment(dec!(1000), dec!(0.01), 1);

        assert_close(payment, dec!(1010), dec!(0.000001));
    }

    #[test]
    fn huge_compound_factor_falls_back_to_limit() {
        let payment = monthly_payment(dec!(1000), dec!(5), 1200);

        assert_eq!(payment, dec!(5000));
    }

    // =========================================================================
    // DscrCalculator tests
    // =========================================================================

    #[test]
    fn default_scenario_is_warning() {
        let state = FieldState::default();
        let rules = fallback_message_rules();

        let result = calculate(&state, &rules);

        assert_eq!(state.loan.loan_amount.value(), dec!(450000));
        assert_close(result.monthly_mortgage_payment, dec!(2734.2474), dec!(0.001));
        assert_eq!(result.monthly_taxes, dec!(625));
        assert_eq!(result.monthly_insurance, dec!(175));
        assert_close(result.total_monthly_expenses, dec!(3534.2474), dec!(0.001));
        assert_close(result.dscr_value, dec!(0.9903), dec!(0.0001));
        assert_eq!(result.message_severity, MessageSeverity::Warning);
        assert_eq!(result.message, rules[2].message);
    }

    #[test]
    fn interest_only_payment_is_interest() {
        let mut state = FieldState::default();
        state.terms.is_interest_only = true;
        let rules = fallback_message_rules();

        let result = calculate(&state, &rules);

        assert_eq!(result.monthly_mortgage_payment, dec!(2296.875));
        assert_eq!(result.total_monthly_expenses, dec!(3096.875));
        assert_eq!(result.message_severity, MessageSeverity::Good);
        assert_eq!(result.message, "You meet the requirements for most loans");
    }

    #[test]
    fn interest_only_overflow_saturates() {
        let mut state = FieldState::default();
        state.terms.is_interest_only = true;
        state.terms.interest_rate.set(dec!(500));
        state.loan.loan_amount.set(dec!(50000000000000000000000000000));
        let rules = fallback_message_rules();

        let result = calculate(&state, &rules);

        assert_eq!(result.monthly_mortgage_payment, Decimal::MAX);
        assert_eq!(result.total_monthly_expenses, Decimal::MAX);
        assert_eq!(result.dscr_value.round_dp(2), Decimal::ZERO);
    }

    #[test]
    fn hoa_fees_add_to_expenses() {
        let mut state = FieldState::default();
        state.escrow.hoa_fees_monthly.set(dec!(250));
        let rules = fallback_message_rules();

        let with_hoa = calculate(&state, &rules);
        let without_hoa = calculate(&FieldState::default(), &rules);

        assert_eq!(
            with_hoa.total_monthly_expenses - without_hoa.total_monthly_expenses,
            dec!(250)
        );
    }

    #[test]
    fn zero_expenses_yield_zero_ratio() {
        let mut state = FieldState::default();
        state.loan.loan_amount = Field::zero();
        state.escrow.taxes.amount = Field::zero();
        state.escrow.insurance.amount = Field::zero();
        let rules = fallback_message_rules();

        let result = calculate(&state, &rules);

        assert_eq!(result.total_monthly_expenses, Decimal::ZERO);
        assert_eq!(result.dscr_value, Decimal::ZERO);
        assert_eq!(result.message_severity, MessageSeverity::Danger);
    }

    #[test]
    fn per_unit_income_uses_synchronized_total() {
        let mut state = FieldState::default();
        state.rental.income_mode = IncomeMode::PerUnit;
        state.rental.number_of_units = 2;
        state.rental.unit_incomes = vec![Field::new(dec!(2500)), Field::new(dec!(2500))];
        state.rental.total_rental_income.set(dec!(5000));
        let rules = fallback_message_rules();

        let result = calculate(&state, &rules);

        assert_eq!(result.rental_income, dec!(5000));
        assert_eq!(result.message_severity, MessageSeverity::Excellent);
    }

    #[test]
    fn unmatched_ratio_uses_generic_message_and_warning() {
        let rules = vec![DscrMessageRule::new(dec!(5), dec!(10), "unreachable")];

        let result = calculate(&FieldState::default(), &rules);

        assert_eq!(result.message, NO_MATCHING_RANGE_MESSAGE);
        assert_eq!(result.message_severity, MessageSeverity::Warning);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![
            DscrMessageRule::new(dec!(0), dec!(2), "first"),
            DscrMessageRule::new(dec!(0.5), dec!(1.5), "second"),
        ];

        let result = calculate(&FieldState::default(), &rules);

        assert_eq!(result.message, "first");
    }

    #[test]
    fn calculation_is_repeatable() {
        let state = FieldState::default();
        let rules = fallback_message_rules();
        let calculator = DscrCalculator::new(&rules);

        let first = calculator.calculate(&state.loan, &state.rental, &state.terms, &state.escrow);
        let second = calculator.calculate(&state.loan, &state.rental, &state.terms, &state.escrow);

        assert_eq!(first, second);
    }
}
