//! Derivation engine: keeps dependent fields consistent after an edit.
//!
//! Three independent groups are maintained:
//!
//! | Group        | Fields                                              | Base            |
//! |--------------|-----------------------------------------------------|-----------------|
//! | Down payment | percent, amount, loan amount                        | property value  |
//! | Escrow       | taxes percent/amount, insurance percent/amount      | property value  |
//! | Rental       | number of units, per-unit incomes, total income     | -               |
//!
//! The direction of every recompute is chosen by the caller. Editing the
//! down payment percent and editing the loan amount are different commands
//! ([`Recompute::DownPaymentByPercent`], [`Recompute::DownPaymentByLoanAmount`]);
//! nothing here guesses which field changed last.
//!
//! Each function takes only the group it owns (plus the property value as a
//! read-only base) and mutates nothing else.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use dscr_core::calculations::{Recompute, recompute};
//! use dscr_core::models::FieldState;
//!
//! let mut state = FieldState::default();
//! state.loan.down_payment_percent.set(dec!(20));
//! recompute(&mut state, Recompute::DownPaymentByPercent);
//!
//! assert_eq!(state.loan.down_payment_amount.value(), dec!(120000));
//! assert_eq!(state.loan.loan_amount.value(), dec!(480000));
//! ```

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::common::checked_ratio;
use crate::models::{
    EntryMode, EscrowLine, Field, FieldState, IncomeMode, LoanInputs, RentalIncome,
    seed_unit_income,
};

/// A recompute command, named after the edit that triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompute {
    /// Percent edited: amount and loan follow.
    DownPaymentByPercent,
    /// Amount edited: percent and loan follow.
    DownPaymentByAmount,
    /// Loan amount edited: amount and percent follow.
    DownPaymentByLoanAmount,
    /// Percent or amount driven, as selected by the down payment mode.
    LoanAmount,
    /// Property value edited: loan amount, taxes and insurance, each in the
    /// direction selected by its mode.
    PropertyValue,
    TaxesByPercent,
    TaxesByAmount,
    InsuranceByPercent,
    InsuranceByAmount,
    /// Unit count or income mode changed: resize and redistribute.
    RentalUnits,
    /// Reconcile total and units without redistributing.
    RentalSync,
    /// A unit income was edited: the total becomes the sum of the units.
    TotalRentalIncome,
}

/// Runs one recompute command against the field state.
pub fn recompute(
    state: &mut FieldState,
    command: Recompute,
) {
    debug!(?command, "recompute");
    let property_value = state.loan.property_value.value();

    match command {
        Recompute::DownPaymentByPercent => down_payment_by_percent(&mut state.loan),
        Recompute::DownPaymentByAmount => down_payment_by_amount(&mut state.loan),
        Recompute::DownPaymentByLoanAmount => down_payment_by_loan_amount(&mut state.loan),
        Recompute::LoanAmount => loan_amount_by_mode(&mut state.loan),
        Recompute::PropertyValue => {
            loan_amount_by_mode(&mut state.loan);
            escrow_by_mode(&mut state.escrow.taxes, property_value);
            escrow_by_mode(&mut state.escrow.insurance, property_value);
        }
        Recompute::TaxesByPercent => {
            escrow_amount_from_percent(&mut state.escrow.taxes, property_value)
        }
        Recompute::TaxesByAmount => {
            escrow_percent_from_amount(&mut state.escrow.taxes, property_value)
        }
        Recompute::InsuranceByPercent => {
            escrow_amount_from_percent(&mut state.escrow.insurance, property_value)
        }
        Recompute::InsuranceByAmount => {
            escrow_percent_from_amount(&mut state.escrow.insurance, property_value)
        }
        Recompute::RentalUnits => update_rental_units(&mut state.rental),
        Recompute::RentalSync => synchronize_rental(&mut state.rental),
        Recompute::TotalRentalIncome => total_from_units(&mut state.rental),
    }
}

// =============================================================================
// Down payment group
// =============================================================================

/// `amount = value * percent / 100`, `loan = value - amount`.
///
/// Skipped when the amount does not fit a [`Decimal`].
pub fn down_payment_by_percent(loan: &mut LoanInputs) {
    let property_value = loan.property_value.value();
    let percent = clamp_percent(loan.down_payment_percent.value());
    if percent != loan.down_payment_percent.value() {
        loan.down_payment_percent.set(percent);
    }

    let Some(down_amount) = share_of(property_value, percent) else {
        warn!(
            property_value = %property_value,
            percent = %percent,
            "down payment amount overflows; not recomputed"
        );
        return;
    };
    loan.down_payment_amount.set(down_amount);
    loan.loan_amount.set(property_value - loan.down_payment_amount.value());
}

/// `percent = amount / value * 100`, `loan = value - amount`.
///
/// Skipped when the property value is zero.
pub fn down_payment_by_amount(loan: &mut LoanInputs) {
    let property_value = loan.property_value.value();
    if property_value <= Decimal::ZERO {
        warn!("property value is zero; down payment percent not recomputed");
        return;
    }

    let down_amount = clamp_to_value(loan.down_payment_amount.value(), property_value);
    if down_amount != loan.down_payment_amount.value() {
        loan.down_payment_amount.set(down_amount);
    }

    if let Some(percent) = percent_of(down_amount, property_value) {
        loan.down_payment_percent.set(percent);
    }
    loan.loan_amount.set(property_value - down_amount);
}

/// `amount = value - loan`, `percent = amount / value * 100`.
///
/// Skipped when the property value is zero.
pub fn down_payment_by_loan_amount(loan: &mut LoanInputs) {
    let property_value = loan.property_value.value();
    if property_value <= Decimal::ZERO {
        warn!("property value is zero; down payment not recomputed from loan amount");
        return;
    }

    let loan_amount = clamp_to_value(loan.loan_amount.value(), property_value);
    if loan_amount != loan.loan_amount.value() {
        loan.loan_amount.set(loan_amount);
    }

    let down_amount = property_value - loan_amount;
    loan.down_payment_amount.set(down_amount);
    if let Some(percent) = percent_of(down_amount, property_value) {
        loan.down_payment_percent.set(percent);
    }
}

/// Percent mode recomputes from the percent, amount mode from the amount.
pub fn loan_amount_by_mode(loan: &mut LoanInputs) {
    match loan.down_payment_mode {
        EntryMode::Percent => down_payment_by_percent(loan),
        EntryMode::Amount => down_payment_by_amount(loan),
    }
}

// =============================================================================
// Escrow group
// =============================================================================

/// `amount = value * percent / 100`; skipped when the amount overflows.
pub fn escrow_amount_from_percent(
    line: &mut EscrowLine,
    property_value: Decimal,
) {
    match share_of(property_value, line.percent.value()) {
        Some(amount) => line.amount.set(amount),
        None => warn!(
            property_value = %property_value,
            percent = %line.percent,
            "escrow amount overflows; not recomputed"
        ),
    }
}

/// `percent = amount / value * 100`; skipped when the property value is zero
/// or the percent overflows.
pub fn escrow_percent_from_amount(
    line: &mut EscrowLine,
    property_value: Decimal,
) {
    match percent_of(line.amount.value(), property_value) {
        Some(percent) => line.percent.set(percent),
        None => warn!(
            property_value = %property_value,
            amount = %line.amount,
            "escrow percent not recomputed"
        ),
    }
}

pub fn escrow_by_mode(
    line: &mut EscrowLine,
    property_value: Decimal,
) {
    match line.mode {
        EntryMode::Percent => escrow_amount_from_percent(line, property_value),
        EntryMode::Amount => escrow_percent_from_amount(line, property_value),
    }
}

// =============================================================================
// Rental income group
// =============================================================================

/// Resizes the unit list after a unit-count or mode change.
///
/// - The unit count is clamped to `1..=10`.
/// - Existing entries keep their position; new slots are `0.00`, except a
///   freshly created slot 0, which gets the seed income.
/// - Per-unit mode first sets the total to the sum of the kept units, so a
///   dropped unit's income leaves the total.
/// - Per-unit mode with several units then spreads that total evenly. The
///   rounding remainder is not assigned to any unit, so the units may sum to
///   a cent off the total.
/// - Total mode with one unit copies the total into unit 0.
pub fn update_rental_units(rental: &mut RentalIncome) {
    rental.number_of_units = RentalIncome::clamp_units(i64::from(rental.number_of_units));
    resize_units(rental);

    match rental.income_mode {
        IncomeMode::PerUnit => {
            total_from_units(rental);
            if rental.number_of_units > 1 {
                let units = Decimal::from(rental.number_of_units);
                let share = rental.total_rental_income.value() / units;
                for income in rental.unit_incomes.iter_mut() {
                    income.set(share);
                }
            }
        }
        IncomeMode::Total => {
            if rental.number_of_units == 1 {
                rental.unit_incomes[0] = rental.total_rental_income.clone();
            }
        }
    }

    debug!(
        units = rental.number_of_units,
        mode = rental.income_mode.as_str(),
        total = %rental.total_rental_income,
        "rental units updated"
    );
}

/// Reconciles total and units without redistributing: per-unit mode takes
/// the sum, total mode with one unit copies the total into unit 0.
pub fn synchronize_rental(rental: &mut RentalIncome) {
    rental.number_of_units = RentalIncome::clamp_units(i64::from(rental.number_of_units));
    resize_units(rental);

    match rental.income_mode {
        IncomeMode::PerUnit => total_from_units(rental),
        IncomeMode::Total if rental.number_of_units == 1 => {
            rental.unit_incomes[0] = rental.total_rental_income.clone();
        }
        IncomeMode::Total => {}
    }
}

/// In per-unit mode, sets the total to the sum of the unit incomes.
///
/// The total is left as is when the sum overflows.
pub fn total_from_units(rental: &mut RentalIncome) {
    if rental.income_mode != IncomeMode::PerUnit {
        return;
    }
    let total = rental
        .unit_incomes
        .iter()
        .try_fold(Decimal::ZERO, |sum, income| sum.checked_add(income.value()));
    match total {
        Some(total) => rental.total_rental_income.set(total),
        None => warn!(
            units = rental.number_of_units,
            "unit incomes overflow; total not recomputed"
        ),
    }
}

fn resize_units(rental: &mut RentalIncome) {
    let wanted = usize::from(rental.number_of_units);
    while rental.unit_incomes.len() < wanted {
        let slot = if rental.unit_incomes.is_empty() {
            seed_unit_income()
        } else {
            Field::zero()
        };
        rental.unit_incomes.push(slot);
    }
    rental.unit_incomes.truncate(wanted);
}

// =============================================================================
// Helpers
// =============================================================================

/// `value * percent / 100`, `None` on overflow.
fn share_of(
    value: Decimal,
    percent: Decimal,
) -> Option<Decimal> {
    value
        .checked_mul(percent)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
}

/// `part / whole * 100`, `None` for a zero base or on overflow.
fn percent_of(
    part: Decimal,
    whole: Decimal,
) -> Option<Decimal> {
    checked_ratio(part, whole).and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
}

fn clamp_percent(percent: Decimal) -> Decimal {
    if percent > Decimal::ONE_HUNDRED {
        warn!(percent = %percent, "down payment percent above 100; clamped");
        return Decimal::ONE_HUNDRED;
    }
    percent.max(Decimal::ZERO)
}

fn clamp_to_value(
    amount: Decimal,
    property_value: Decimal,
) -> Decimal {
    if amount > property_value {
        warn!(
            amount = %amount,
            property_value = %property_value,
            "amount exceeds property value; clamped"
        );
        return property_value;
    }
    amount.max(Decimal::ZERO)
}
