//! Shareable-link codec: field state to query parameters and back.
//!
//! Keys, in emitted order:
//!
//! | Key                 | Value                                   |
//! |---------------------|-----------------------------------------|
//! | `isRefi`            | `true` / `false`                        |
//! | `propertyValue`     | decimal                                 |
//! | `loanAmount`        | decimal                                 |
//! | `numberOfUnits`     | integer, clamped to `1..=10` on read    |
//! | `rentalIncomeMethod`| `total` / `perUnit`                     |
//! | `totalRentalIncome` | decimal                                 |
//! | `unitIncome{i}`     | decimal, per-unit mode only             |
//! | `interestRate`      | decimal                                 |
//! | `termYears`         | integer > 0                             |
//! | `isInterestOnly`    | `true` / `false`                        |
//! | `taxesPercent`      | decimal                                 |
//! | `insurancePercent`  | decimal                                 |
//! | `hoaFees`           | decimal                                 |
//! | `v`                 | timestamp in ms, ignored on read        |
//!
//! Decoding never fails: unknown keys are ignored and malformed values
//! leave the field unchanged (integers) or read as their leading number
//! (decimals, where no leading number reads as 0).
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use dscr_core::models::FieldState;
//! use dscr_core::url_codec::decode;
//!
//! let mut state = FieldState::default();
//! let patch = decode("?propertyValue=500000&loanAmount=400000&termYears=abc", &state);
//! patch.apply_to(&mut state);
//!
//! assert_eq!(state.loan.down_payment_percent.value(), dec!(20));
//! assert_eq!(state.terms.term_years, 30);
//! assert!(!patch.auto_calculate());
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::calculations::common::{parse_leading_decimal, parse_leading_integer};
use crate::calculations::{Recompute, recompute};
use crate::models::{Field, FieldState, IncomeMode, RentalIncome};

pub const IS_REFI: &str = "isRefi";
pub const PROPERTY_VALUE: &str = "propertyValue";
pub const LOAN_AMOUNT: &str = "loanAmount";
pub const NUMBER_OF_UNITS: &str = "numberOfUnits";
pub const RENTAL_INCOME_METHOD: &str = "rentalIncomeMethod";
pub const TOTAL_RENTAL_INCOME: &str = "totalRentalIncome";
pub const UNIT_INCOME_PREFIX: &str = "unitIncome";
pub const INTEREST_RATE: &str = "interestRate";
pub const TERM_YEARS: &str = "termYears";
pub const IS_INTEREST_ONLY: &str = "isInterestOnly";
pub const TAXES_PERCENT: &str = "taxesPercent";
pub const INSURANCE_PERCENT: &str = "insurancePercent";
pub const HOA_FEES: &str = "hoaFees";
pub const CACHE_BUSTER: &str = "v";

/// Keys whose joint presence requests a calculation right after import.
const AUTO_CALCULATE_KEYS: [&str; 4] =
    [PROPERTY_VALUE, LOAN_AMOUNT, TOTAL_RENTAL_INCOME, INTEREST_RATE];

/// Encodes `state`, stamping `v` with the current UTC time in milliseconds.
pub fn encode(state: &FieldState) -> String {
    encode_at(state, Utc::now().timestamp_millis())
}

/// Encodes `state` with a caller-supplied `v` timestamp.
///
/// Amounts and percents are written as canonical numbers, not display
/// strings (`450000`, not `450,000.00`).
pub fn encode_at(
    state: &FieldState,
    timestamp_ms: i64,
) -> String {
    let mut query = QueryBuilder::default();

    query.push(IS_REFI, bool_param(state.loan.is_refi));
    query.push(PROPERTY_VALUE, decimal_param(&state.loan.property_value));
    query.push(LOAN_AMOUNT, decimal_param(&state.loan.loan_amount));
    query.push(NUMBER_OF_UNITS, state.rental.number_of_units.to_string());
    query.push(RENTAL_INCOME_METHOD, state.rental.income_mode.as_str().to_string());
    query.push(TOTAL_RENTAL_INCOME, decimal_param(&state.rental.total_rental_income));
    if state.rental.income_mode == IncomeMode::PerUnit {
        for (index, income) in state.rental.unit_incomes.iter().enumerate() {
            query.push(&unit_income_key(index), decimal_param(income));
        }
    }
    query.push(INTEREST_RATE, decimal_param(&state.terms.interest_rate));
    query.push(TERM_YEARS, state.terms.term_years.to_string());
    query.push(IS_INTEREST_ONLY, bool_param(state.terms.is_interest_only));
    query.push(TAXES_PERCENT, decimal_param(&state.escrow.taxes.percent));
    query.push(INSURANCE_PERCENT, decimal_param(&state.escrow.insurance.percent));
    query.push(HOA_FEES, decimal_param(&state.escrow.hoa_fees_monthly));
    query.push(CACHE_BUSTER, timestamp_ms.to_string());

    query.finish()
}

/// Parses a query string into a patch against `current`.
///
/// `query` may be a bare query (`a=1&b=2`), a query with a leading `?`, or a
/// full URL; anything after `#` is ignored. When a key repeats, the first
/// occurrence wins.
pub fn decode(
    query: &str,
    current: &FieldState,
) -> StatePatch {
    let params = QueryParams::parse(query);
    let mut patch = StatePatch::default();

    patch.is_refi = params.get(IS_REFI).map(parse_bool);
    patch.property_value = params.decimal(PROPERTY_VALUE);
    patch.loan_amount = params.decimal(LOAN_AMOUNT);
    patch.number_of_units = params.get(NUMBER_OF_UNITS).and_then(parse_units);
    patch.income_mode = params.get(RENTAL_INCOME_METHOD).and_then(IncomeMode::parse);
    patch.total_rental_income = params.decimal(TOTAL_RENTAL_INCOME);

    let units = patch
        .number_of_units
        .unwrap_or(current.rental.number_of_units);
    patch.unit_incomes = (0..usize::from(units))
        .map(|index| {
            params
                .decimal(&unit_income_key(index))
                .unwrap_or_else(|| default_unit_income(index))
        })
        .collect();

    patch.interest_rate = params.decimal(INTEREST_RATE);
    patch.term_years = params.get(TERM_YEARS).and_then(parse_term_years);
    patch.is_interest_only = params.get(IS_INTEREST_ONLY).map(parse_bool);
    patch.taxes_percent = params.decimal(TAXES_PERCENT);
    patch.insurance_percent = params.decimal(INSURANCE_PERCENT);
    patch.hoa_fees = params.decimal(HOA_FEES);

    patch.auto_calculate = AUTO_CALCULATE_KEYS.iter().all(|key| params.contains(key));

    debug!(
        keys = params.len(),
        auto_calculate = patch.auto_calculate,
        "query decoded"
    );
    patch
}

/// The recognized, validated parameters of a shareable link.
///
/// `None` means the parameter was absent or rejected; applying the patch
/// leaves that field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub is_refi: Option<bool>,
    pub property_value: Option<Decimal>,
    pub loan_amount: Option<Decimal>,
    pub number_of_units: Option<u8>,
    pub income_mode: Option<IncomeMode>,
    pub total_rental_income: Option<Decimal>,
    /// One entry per unit; missing entries hold the unit defaults.
    pub unit_incomes: Vec<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub term_years: Option<u32>,
    pub is_interest_only: Option<bool>,
    pub taxes_percent: Option<Decimal>,
    pub insurance_percent: Option<Decimal>,
    pub hoa_fees: Option<Decimal>,
    auto_calculate: bool,
}

impl StatePatch {
    /// Whether the link carried everything needed to calculate on import.
    pub fn auto_calculate(&self) -> bool {
        self.auto_calculate
    }

    /// Applies the patch, running the recomputes each imported field drives.
    ///
    /// A loan amount derives the down payment from the (possibly imported)
    /// property value; tax and insurance percents derive their amounts.
    /// Rental totals and units are reconciled last, without redistributing.
    pub fn apply_to(
        &self,
        state: &mut FieldState,
    ) {
        if let Some(is_refi) = self.is_refi {
            state.loan.is_refi = is_refi;
        }
        if let Some(value) = self.property_value {
            state.loan.property_value.set(value);
        }
        if let Some(loan_amount) = self.loan_amount {
            state.loan.loan_amount.set(loan_amount);
            recompute(state, Recompute::DownPaymentByLoanAmount);
        }

        if let Some(units) = self.number_of_units {
            state.rental.number_of_units = units;
        }
        if let Some(mode) = self.income_mode {
            state.rental.income_mode = mode;
        }
        if let Some(total) = self.total_rental_income {
            state.rental.total_rental_income.set(total);
        }
        if !self.unit_incomes.is_empty() {
            state.rental.unit_incomes = self.unit_incomes.iter().copied().map(Field::new).collect();
        }

        if let Some(rate) = self.interest_rate {
            state.terms.interest_rate.set(rate);
        }
        if let Some(years) = self.term_years {
            state.terms.term_years = years;
        }
        if let Some(interest_only) = self.is_interest_only {
            state.terms.is_interest_only = interest_only;
        }

        if let Some(percent) = self.taxes_percent {
            state.escrow.taxes.percent.set(percent);
            recompute(state, Recompute::TaxesByPercent);
        }
        if let Some(percent) = self.insurance_percent {
            state.escrow.insurance.percent.set(percent);
            recompute(state, Recompute::InsuranceByPercent);
        }
        if let Some(hoa) = self.hoa_fees {
            state.escrow.hoa_fees_monthly.set(hoa);
        }

        recompute(state, Recompute::RentalSync);
    }
}

pub fn unit_income_key(index: usize) -> String {
    format!("{UNIT_INCOME_PREFIX}{index}")
}

fn default_unit_income(index: usize) -> Decimal {
    if index == 0 { dec!(3500) } else { Decimal::ZERO }
}

fn bool_param(value: bool) -> String {
    value.to_string()
}

fn decimal_param(field: &Field) -> String {
    field.value().normalize().to_string()
}

fn parse_bool(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Leading number, 0 when there is none; negative values are rejected.
fn parse_non_negative(value: &str) -> Option<Decimal> {
    let number = parse_leading_decimal(value).unwrap_or(Decimal::ZERO);
    if number.is_sign_negative() && !number.is_zero() {
        debug!(value, "negative parameter ignored");
        return None;
    }
    Some(number.abs())
}

fn parse_units(value: &str) -> Option<u8> {
    match parse_leading_integer(value) {
        Some(units) => Some(RentalIncome::clamp_units(units)),
        None => {
            debug!(value, "unreadable unit count ignored");
            None
        }
    }
}

fn parse_term_years(value: &str) -> Option<u32> {
    let years = parse_leading_integer(value).and_then(|years| u32::try_from(years).ok());
    match years {
        Some(years) if years > 0 => Some(years),
        _ => {
            debug!(value, "invalid term ignored");
            None
        }
    }
}

#[derive(Default)]
struct QueryBuilder {
    query: String,
}

impl QueryBuilder {
    fn push(
        &mut self,
        key: &str,
        value: String,
    ) {
        if !self.query.is_empty() {
            self.query.push('&');
        }
        self.query.push_str(key);
        self.query.push('=');
        self.query.push_str(&urlencoding::encode(&value));
    }

    fn finish(self) -> String {
        self.query
    }
}

struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    fn parse(input: &str) -> Self {
        let without_fragment = input.split_once('#').map_or(input, |(before, _)| before);
        let query = without_fragment
            .split_once('?')
            .map_or(without_fragment, |(_, after)| after);

        let mut values = HashMap::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let (Some(key), Some(value)) = (decode_component(key), decode_component(value)) else {
                debug!(pair, "undecodable query pair ignored");
                continue;
            };
            values.entry(key).or_insert(value);
        }
        Self { values }
    }

    fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.values.contains_key(key)
    }

    fn decimal(
        &self,
        key: &str,
    ) -> Option<Decimal> {
        self.get(key).and_then(parse_non_negative)
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    urlencoding::decode(&spaced).ok().map(Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::EntryMode;

    const TS: i64 = 1_700_000_000_000;

    fn per_unit_state() -> FieldState {
        let mut state = FieldState::default();
        state.loan.is_refi = true;
        state.loan.property_value.set(dec!(800000));
        state.loan.down_payment_percent.set(dec!(20));
        recompute(&mut state, Recompute::DownPaymentByPercent);
        state.rental.number_of_units = 3;
        state.rental.income_mode = IncomeMode::PerUnit;
        state.rental.unit_incomes = vec![
            Field::new(dec!(1800)),
            Field::new(dec!(2150.50)),
            Field::new(dec!(1975)),
        ];
        recompute(&mut state, Recompute::TotalRentalIncome);
        state.terms.interest_rate.set(dec!(7.375));
        state.terms.term_years = 25;
        state.escrow.taxes.percent.set(dec!(1.5));
        recompute(&mut state, Recompute::TaxesByPercent);
        state.escrow.insurance.percent.set(dec!(0.4));
        recompute(&mut state, Recompute::InsuranceByPercent);
        state.escrow.hoa_fees_monthly.set(dec!(125));
        state
    }

    // =========================================================================
    // encode tests
    // =========================================================================

    #[test]
    fn encode_default_state() {
        let query = encode_at(&FieldState::default(), TS);

        assert_eq!(
            query,
            "isRefi=false&propertyValue=600000&loanAmount=450000&numberOfUnits=1\
             &rentalIncomeMethod=total&totalRentalIncome=3500&interestRate=6.125\
             &termYears=30&isInterestOnly=false&taxesPercent=1.25&insurancePercent=0.35\
             &hoaFees=0&v=1700000000000"
        );
    }

    #[test]
    fn encode_lists_units_only_in_per_unit_mode() {
        let query = encode_at(&per_unit_state(), TS);

        assert!(query.contains("&unitIncome0=1800&unitIncome1=2150.5&unitIncome2=1975&"));
        assert!(query.contains("totalRentalIncome=5925.5"));
        assert!(!encode_at(&FieldState::default(), TS).contains(UNIT_INCOME_PREFIX));
    }

    #[test]
    fn encode_stamps_current_time() {
        let before = Utc::now().timestamp_millis();
        let query = encode(&FieldState::default());

        let stamp: i64 = query
            .rsplit_once("v=")
            .and_then(|(_, ts)| ts.parse().ok())
            .unwrap();
        assert!(stamp >= before);
    }

    // =========================================================================
    // decode tests
    // =========================================================================

    #[test]
    fn round_trip_restores_per_unit_state() {
        let original = per_unit_state();
        let query = encode_at(&original, TS);

        let mut restored = FieldState::default();
        decode(&query, &restored).apply_to(&mut restored);

        assert_eq!(restored, original);
    }

    #[test]
    fn round_trip_restores_encoded_fields_of_uneven_loan() {
        let mut original = FieldState::default();
        original.loan.loan_amount.set(dec!(451234.56));
        recompute(&mut original, Recompute::DownPaymentByLoanAmount);
        original.rental.total_rental_income.set(dec!(4321.09));
        recompute(&mut original, Recompute::RentalSync);
        let query = encode_at(&original, TS);

        let mut restored = FieldState::default();
        decode(&query, &restored).apply_to(&mut restored);

        assert_eq!(encode_at(&restored, TS), query);
        assert_eq!(restored.loan.loan_amount.value(), dec!(451234.56));
    }

    #[test]
    fn accepts_full_url_and_leading_question_mark() {
        let state = FieldState::default();
        let from_url = decode("https://example.com/calc/?termYears=15#results", &state);
        let from_query = decode("?termYears=15", &state);

        assert_eq!(from_url.term_years, Some(15));
        assert_eq!(from_query.term_years, Some(15));
    }

    #[test]
    fn malformed_term_leaves_prior_value() {
        let mut state = FieldState::default();
        state.terms.term_years = 20;

        decode("termYears=abc", &state).apply_to(&mut state);
        assert_eq!(state.terms.term_years, 20);

        decode("termYears=0", &state).apply_to(&mut state);
        assert_eq!(state.terms.term_years, 20);

        decode("termYears=-5", &state).apply_to(&mut state);
        assert_eq!(state.terms.term_years, 20);
    }

    #[test]
    fn booleans_accept_true_and_one() {
        let state = FieldState::default();

        assert_eq!(decode("isRefi=true", &state).is_refi, Some(true));
        assert_eq!(decode("isRefi=1", &state).is_refi, Some(true));
        assert_eq!(decode("isRefi=yes", &state).is_refi, Some(false));
        assert_eq!(decode("isInterestOnly=TRUE", &state).is_interest_only, Some(false));
    }

    #[test]
    fn unit_count_is_clamped() {
        let state = FieldState::default();

        assert_eq!(decode("numberOfUnits=25", &state).number_of_units, Some(10));
        assert_eq!(decode("numberOfUnits=0", &state).number_of_units, Some(1));
        assert_eq!(decode("numberOfUnits=4.9", &state).number_of_units, Some(4));
        assert_eq!(decode("numberOfUnits=many", &state).number_of_units, None);
    }

    #[test]
    fn income_method_must_match_exactly() {
        let state = FieldState::default();

        assert_eq!(
            decode("rentalIncomeMethod=perUnit", &state).income_mode,
            Some(IncomeMode::PerUnit)
        );
        assert_eq!(decode("rentalIncomeMethod=PerUnit", &state).income_mode, None);
        assert_eq!(decode("rentalIncomeMethod=total", &state).income_mode, Some(IncomeMode::Total));
    }

    #[test]
    fn missing_unit_incomes_get_defaults() {
        let state = FieldState::default();

        let patch = decode("numberOfUnits=3&unitIncome1=1200", &state);

        assert_eq!(patch.unit_incomes, vec![dec!(3500), dec!(1200), Decimal::ZERO]);
    }

    #[test]
    fn unit_incomes_follow_current_count_when_absent() {
        let mut state = FieldState::default();
        state.rental.number_of_units = 2;

        let patch = decode("unitIncome0=900", &state);

        assert_eq!(patch.unit_incomes, vec![dec!(900), Decimal::ZERO]);
    }

    #[test]
    fn decimals_read_leading_number() {
        let state = FieldState::default();

        assert_eq!(decode("hoaFees=12abc", &state).hoa_fees, Some(dec!(12)));
        assert_eq!(decode("hoaFees=abc", &state).hoa_fees, Some(Decimal::ZERO));
        assert_eq!(decode("hoaFees=-40", &state).hoa_fees, None);
    }

    #[test]
    fn first_occurrence_wins_and_escapes_decode() {
        let state = FieldState::default();

        let patch = decode("interestRate=%207.25&interestRate=9", &state);
        assert_eq!(patch.interest_rate, Some(dec!(7.25)));

        let patch = decode("rentalIncomeMethod=per+Unit", &state);
        assert_eq!(patch.income_mode, None);
    }

    #[test]
    fn unknown_keys_and_cache_buster_are_ignored() {
        let state = FieldState::default();

        let patch = decode("v=123&existing1st=true&=&&foo", &state);

        assert_eq!(
            patch,
            StatePatch {
                unit_incomes: vec![dec!(3500)],
                ..StatePatch::default()
            }
        );
    }

    #[test]
    fn auto_calculate_requires_all_four_keys() {
        let state = FieldState::default();

        let full = decode(
            "propertyValue=1&loanAmount=1&totalRentalIncome=1&interestRate=1",
            &state,
        );
        let partial = decode("propertyValue=1&loanAmount=1&totalRentalIncome=1", &state);

        assert!(full.auto_calculate());
        assert!(!partial.auto_calculate());
    }

    #[test]
    fn loan_amount_derives_down_payment_from_new_value() {
        let mut state = FieldState::default();
        state.loan.down_payment_mode = EntryMode::Amount;

        decode("propertyValue=500000&loanAmount=375000", &state).apply_to(&mut state);

        assert_eq!(state.loan.down_payment_amount.value(), dec!(125000));
        assert_eq!(state.loan.down_payment_percent.value(), dec!(25));
    }

    #[test]
    fn tax_percent_derives_amount() {
        let mut state = FieldState::default();

        decode("taxesPercent=2", &state).apply_to(&mut state);

        assert_eq!(state.escrow.taxes.amount.value(), dec!(12000));
        // Insurance untouched.
        assert_eq!(state.escrow.insurance.amount.value(), dec!(2100));
    }
}
