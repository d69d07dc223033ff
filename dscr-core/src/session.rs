//! A single calculator session: field state, loaded message rules and the
//! outputs derived from them.
//!
//! The session owns its [`FieldState`] exclusively. Every edit goes through
//! [`Session::apply`], which stores the value, runs the recompute command
//! matching the edited field and invalidates the previous result and link.
//!
//! # Example
//!
//! ```
//! use dscr_core::models::{MessageSeverity, fallback_message_rules};
//! use dscr_core::session::{FieldEdit, Session};
//!
//! let mut session = Session::new(fallback_message_rules());
//! session.apply(FieldEdit::parse("totalRentalIncome", "4,500").unwrap());
//!
//! let result = session.calculate();
//! assert_eq!(result.message_severity, MessageSeverity::Excellent);
//! assert!(session.shareable_link().is_none());
//! ```

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculations::common::parse_leading_integer;
use crate::calculations::{DscrCalculator, Recompute, recompute};
use crate::defaults::{DefaultsProvider, LoadedDefaults, RateDefaults, load_defaults};
use crate::models::{DscrMessageRule, DscrResult, EntryMode, FieldState, IncomeMode, RentalIncome};
use crate::url_codec::{self, StatePatch, UNIT_INCOME_PREFIX};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldEditError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },
}

/// One user edit. Text payloads are read with the display parser, so
/// `"450,000.00"`, `"$450000"` and `"450000"` are the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    IsRefi(bool),
    PropertyValue(String),
    DownPaymentMode(EntryMode),
    DownPaymentPercent(String),
    DownPaymentAmount(String),
    LoanAmount(String),
    NumberOfUnits(i64),
    IncomeMode(IncomeMode),
    TotalRentalIncome(String),
    UnitIncome { index: usize, value: String },
    InterestRate(String),
    TermYears(u32),
    InterestOnly(bool),
    TaxesMode(EntryMode),
    TaxesPercent(String),
    TaxesAmount(String),
    InsuranceMode(EntryMode),
    InsurancePercent(String),
    InsuranceAmount(String),
    HoaFees(String),
}

impl FieldEdit {
    /// Builds an edit from a field key and its text value.
    ///
    /// Accepts the shareable-link keys plus the fields a link does not carry
    /// (`downPaymentMode`, `downPaymentPercent`, `downPaymentAmount`,
    /// `taxesMode`, `taxesAmount`, `insuranceMode`, `insuranceAmount`).
    pub fn parse(
        key: &str,
        value: &str,
    ) -> Result<Self, FieldEditError> {
        let text = value.to_string();
        let edit = match key {
            url_codec::IS_REFI => Self::IsRefi(parse_flag(value)),
            url_codec::PROPERTY_VALUE => Self::PropertyValue(text),
            "downPaymentMode" => Self::DownPaymentMode(parse_with(key, value, EntryMode::parse)?),
            "downPaymentPercent" => Self::DownPaymentPercent(text),
            "downPaymentAmount" => Self::DownPaymentAmount(text),
            url_codec::LOAN_AMOUNT => Self::LoanAmount(text),
            url_codec::NUMBER_OF_UNITS => {
                Self::NumberOfUnits(parse_with(key, value, parse_leading_integer)?)
            }
            url_codec::RENTAL_INCOME_METHOD => {
                Self::IncomeMode(parse_with(key, value, IncomeMode::parse)?)
            }
            url_codec::TOTAL_RENTAL_INCOME => Self::TotalRentalIncome(text),
            url_codec::INTEREST_RATE => Self::InterestRate(text),
            url_codec::TERM_YEARS => Self::TermYears(parse_with(key, value, parse_term)?),
            url_codec::IS_INTEREST_ONLY => Self::InterestOnly(parse_flag(value)),
            "taxesMode" => Self::TaxesMode(parse_with(key, value, EntryMode::parse)?),
            url_codec::TAXES_PERCENT => Self::TaxesPercent(text),
            "taxesAmount" => Self::TaxesAmount(text),
            "insuranceMode" => Self::InsuranceMode(parse_with(key, value, EntryMode::parse)?),
            url_codec::INSURANCE_PERCENT => Self::InsurancePercent(text),
            "insuranceAmount" => Self::InsuranceAmount(text),
            url_codec::HOA_FEES => Self::HoaFees(text),
            other => {
                let index = other
                    .strip_prefix(UNIT_INCOME_PREFIX)
                    .and_then(|index| index.parse::<usize>().ok())
                    .ok_or_else(|| FieldEditError::UnknownField(other.to_string()))?;
                Self::UnitIncome { index, value: text }
            }
        };
        Ok(edit)
    }
}

fn parse_flag(value: &str) -> bool {
    value == "true" || value == "1"
}

fn parse_term(value: &str) -> Option<u32> {
    parse_leading_integer(value)
        .and_then(|years| u32::try_from(years).ok())
        .filter(|years| *years > 0)
}

fn parse_with<T>(
    key: &str,
    value: &str,
    parser: impl FnOnce(&str) -> Option<T>,
) -> Result<T, FieldEditError> {
    parser(value).ok_or_else(|| FieldEditError::InvalidValue {
        field: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct Session {
    state: FieldState,
    message_rules: Vec<DscrMessageRule>,
    result: Option<DscrResult>,
    shareable_link: Option<String>,
}

impl Session {
    /// A session over the seed state with the given message rules.
    pub fn new(message_rules: Vec<DscrMessageRule>) -> Self {
        Self {
            state: FieldState::default(),
            message_rules,
            result: None,
            shareable_link: None,
        }
    }

    /// Loads defaults from `provider` (falling back on failure), imports
    /// `query` if given, and calculates right away when the link carried
    /// every required field.
    pub async fn initialize(
        provider: &dyn DefaultsProvider,
        query: Option<&str>,
    ) -> Self {
        let defaults = load_defaults(provider).await;
        Self::from_defaults(defaults, query)
    }

    /// The synchronous part of [`Session::initialize`].
    pub fn from_defaults(
        defaults: LoadedDefaults,
        query: Option<&str>,
    ) -> Self {
        let LoadedDefaults {
            rates,
            message_rules,
        } = defaults;
        let mut session = Self::new(message_rules.into_value());
        session.apply_rate_defaults(*rates.value());

        let patch = query.map(|query| url_codec::decode(query, &session.state));
        if let Some(patch) = &patch {
            patch.apply_to(&mut session.state);
        }
        session.run_initial_recomputes(patch.as_ref());

        if patch.as_ref().is_some_and(StatePatch::auto_calculate) {
            info!("shareable link carried all inputs; calculating");
            session.calculate();
        }
        session
    }

    fn apply_rate_defaults(
        &mut self,
        rates: RateDefaults,
    ) {
        let rates = rates.normalized();
        self.state.escrow.taxes.percent.set(rates.taxes_percent);
        self.state.escrow.insurance.percent.set(rates.insurance_percent);
        self.state.terms.interest_rate.set(rates.interest_rate);
        recompute(&mut self.state, Recompute::TaxesByPercent);
        recompute(&mut self.state, Recompute::InsuranceByPercent);
    }

    fn run_initial_recomputes(
        &mut self,
        patch: Option<&StatePatch>,
    ) {
        // An imported loan amount is kept as-is; re-deriving it from the
        // rounded percent would move it by up to half a basis point.
        let loan_command = if patch.is_some_and(|patch| patch.loan_amount.is_some()) {
            Recompute::DownPaymentByLoanAmount
        } else {
            Recompute::LoanAmount
        };
        for command in [
            loan_command,
            Recompute::RentalSync,
            Recompute::TaxesByPercent,
            Recompute::InsuranceByPercent,
        ] {
            recompute(&mut self.state, command);
        }
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn message_rules(&self) -> &[DscrMessageRule] {
        &self.message_rules
    }

    /// The last calculation, cleared by any edit.
    pub fn result(&self) -> Option<&DscrResult> {
        self.result.as_ref()
    }

    /// The last generated link, cleared by any edit or calculation.
    pub fn shareable_link(&self) -> Option<&str> {
        self.shareable_link.as_deref()
    }

    pub fn property_value_label(&self) -> &'static str {
        self.state.loan.property_value_label()
    }

    /// Stores an edit and runs the recompute it drives.
    pub fn apply(
        &mut self,
        edit: FieldEdit,
    ) {
        debug!(?edit, "applying edit");
        let state = &mut self.state;

        let command = match edit {
            FieldEdit::IsRefi(is_refi) => {
                state.loan.is_refi = is_refi;
                None
            }
            FieldEdit::PropertyValue(text) => {
                state.loan.property_value.set_text(&text);
                Some(Recompute::PropertyValue)
            }
            FieldEdit::DownPaymentMode(mode) => {
                state.loan.down_payment_mode = mode;
                None
            }
            FieldEdit::DownPaymentPercent(text) => {
                state.loan.down_payment_percent.set_text(&text);
                Some(Recompute::DownPaymentByPercent)
            }
            FieldEdit::DownPaymentAmount(text) => {
                state.loan.down_payment_amount.set_text(&text);
                Some(Recompute::DownPaymentByAmount)
            }
            FieldEdit::LoanAmount(text) => {
                state.loan.loan_amount.set_text(&text);
                Some(Recompute::DownPaymentByLoanAmount)
            }
            FieldEdit::NumberOfUnits(units) => {
                state.rental.number_of_units = RentalIncome::clamp_units(units);
                Some(Recompute::RentalUnits)
            }
            FieldEdit::IncomeMode(mode) => {
                state.rental.income_mode = mode;
                Some(Recompute::RentalUnits)
            }
            FieldEdit::TotalRentalIncome(text) => {
                state.rental.total_rental_income.set_text(&text);
                let single_unit = state.rental.number_of_units == 1;
                if state.rental.income_mode == IncomeMode::PerUnit && single_unit {
                    // The single unit is the total.
                    state.rental.unit_incomes[0].set_text(&text);
                }
                Some(Recompute::RentalUnits)
            }
            FieldEdit::UnitIncome { index, value } => {
                if index >= state.rental.unit_incomes.len() {
                    warn!(
                        index,
                        units = state.rental.number_of_units,
                        "unit income index out of range; edit ignored"
                    );
                    return;
                }
                state.rental.unit_incomes[index].set_text(&value);
                Some(Recompute::TotalRentalIncome)
            }
            FieldEdit::InterestRate(text) => {
                state.terms.interest_rate.set_text(&text);
                None
            }
            FieldEdit::TermYears(years) => {
                state.terms.term_years = years;
                None
            }
            FieldEdit::InterestOnly(interest_only) => {
                state.terms.is_interest_only = interest_only;
                None
            }
            FieldEdit::TaxesMode(mode) => {
                state.escrow.taxes.mode = mode;
                None
            }
            FieldEdit::TaxesPercent(text) => {
                state.escrow.taxes.percent.set_text(&text);
                Some(Recompute::TaxesByPercent)
            }
            FieldEdit::TaxesAmount(text) => {
                state.escrow.taxes.amount.set_text(&text);
                Some(Recompute::TaxesByAmount)
            }
            FieldEdit::InsuranceMode(mode) => {
                state.escrow.insurance.mode = mode;
                None
            }
            FieldEdit::InsurancePercent(text) => {
                state.escrow.insurance.percent.set_text(&text);
                Some(Recompute::InsuranceByPercent)
            }
            FieldEdit::InsuranceAmount(text) => {
                state.escrow.insurance.amount.set_text(&text);
                Some(Recompute::InsuranceByAmount)
            }
            FieldEdit::HoaFees(text) => {
                state.escrow.hoa_fees_monthly.set_text(&text);
                None
            }
        };

        if let Some(command) = command {
            recompute(state, command);
        }
        self.result = None;
        self.shareable_link = None;
    }

    /// Runs the DSCR calculation on the current state and keeps the result.
    pub fn calculate(&mut self) -> &DscrResult {
        let state = &self.state;
        let result = DscrCalculator::new(&self.message_rules).calculate(
            &state.loan,
            &state.rental,
            &state.terms,
            &state.escrow,
        );
        self.shareable_link = None;
        self.result.insert(result)
    }

    /// Builds the shareable link for the current state.
    ///
    /// Any query or fragment already on `base_url` is dropped.
    pub fn share(
        &mut self,
        base_url: &str,
    ) -> &str {
        let query = url_codec::encode(&self.state);
        self.store_link(base_url, &query)
    }

    /// [`Session::share`] with a fixed cache-busting timestamp.
    pub fn share_at(
        &mut self,
        base_url: &str,
        timestamp_ms: i64,
    ) -> &str {
        let query = url_codec::encode_at(&self.state, timestamp_ms);
        self.store_link(base_url, &query)
    }

    fn store_link(
        &mut self,
        base_url: &str,
        query: &str,
    ) -> &str {
        let base = base_url
            .split(['?', '#'])
            .next()
            .unwrap_or(base_url);
        self.shareable_link.insert(format!("{base}?{query}"))
    }
}
