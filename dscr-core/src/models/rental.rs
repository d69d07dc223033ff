use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{Field, IncomeMode};

pub const MIN_UNITS: u8 = 1;
pub const MAX_UNITS: u8 = 10;

/// Income seeded into the first unit slot when it is created fresh.
pub fn seed_unit_income() -> Field {
    Field::new(dec!(3500))
}

/// Rental income, either as one total or per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalIncome {
    /// Always within `MIN_UNITS..=MAX_UNITS`.
    pub number_of_units: u8,
    pub income_mode: IncomeMode,
    pub total_rental_income: Field,
    /// One entry per unit.
    pub unit_incomes: Vec<Field>,
}

impl RentalIncome {
    pub fn clamp_units(units: i64) -> u8 {
        units.clamp(i64::from(MIN_UNITS), i64::from(MAX_UNITS)) as u8
    }
}

impl Default for RentalIncome {
    fn default() -> Self {
        Self {
            number_of_units: 1,
            income_mode: IncomeMode::Total,
            total_rental_income: Field::new(dec!(3500)),
            unit_incomes: vec![seed_unit_income()],
        }
    }
}
