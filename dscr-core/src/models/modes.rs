use serde::{Deserialize, Serialize};

/// Which member of a percent/amount pair the user is entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntryMode {
    #[default]
    Percent,
    Amount,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Amount => "amount",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percent" => Some(Self::Percent),
            "amount" => Some(Self::Amount),
            _ => None,
        }
    }
}

/// How rental income is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IncomeMode {
    /// One aggregate figure.
    #[default]
    Total,
    /// One figure per unit, summed into the total.
    PerUnit,
}

impl IncomeMode {
    /// The value used by the `rentalIncomeMethod` URL parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::PerUnit => "perUnit",
        }
    }

    /// Accepts exactly `"total"` or `"perUnit"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "total" => Some(Self::Total),
            "perUnit" => Some(Self::PerUnit),
            _ => None,
        }
    }
}
