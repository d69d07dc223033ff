use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::calculations::common::round_to;
use crate::models::{
    DISPLAY_SCALE, DscrMessageRule, MessageRuleError, RATE_SCALE, fallback_message_rules,
    validate_message_rules,
};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Invalid message rules: {0}")]
    InvalidRules(#[from] MessageRuleError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Startup defaults for the percent and rate inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDefaults {
    pub taxes_percent: Decimal,
    pub insurance_percent: Decimal,
    pub interest_rate: Decimal,
}

impl RateDefaults {
    /// Percents rounded to two decimals, the rate to three.
    pub fn normalized(self) -> Self {
        Self {
            taxes_percent: round_to(self.taxes_percent, DISPLAY_SCALE),
            insurance_percent: round_to(self.insurance_percent, DISPLAY_SCALE),
            interest_rate: round_to(self.interest_rate, RATE_SCALE),
        }
    }
}

impl Default for RateDefaults {
    /// The fixed fallback constants.
    fn default() -> Self {
        Self {
            taxes_percent: dec!(1.25),
            insurance_percent: dec!(0.35),
            interest_rate: dec!(6.125),
        }
    }
}

/// Source of startup defaults and DSCR message rules.
#[async_trait]
pub trait DefaultsProvider: Send + Sync {
    async fn rate_defaults(&self) -> Result<RateDefaults, ProviderError>;
    async fn message_rules(&self) -> Result<Vec<DscrMessageRule>, ProviderError>;
}

/// A value loaded at startup, or the fallback used in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded<T> {
    Fetched(T),
    Fallback { value: T, reason: String },
}

impl<T> Loaded<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Fetched(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Fetched(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Everything the calculator loads before it initializes its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDefaults {
    pub rates: Loaded<RateDefaults>,
    pub message_rules: Loaded<Vec<DscrMessageRule>>,
}

/// Loads rate defaults and message rules, substituting the fallback
/// constants for whichever part fails. Never returns an error.
pub async fn load_defaults(provider: &dyn DefaultsProvider) -> LoadedDefaults {
    let rates = match provider.rate_defaults().await {
        Ok(rates) => {
            let rates = rates.normalized();
            info!(
                taxes_percent = %rates.taxes_percent,
                insurance_percent = %rates.insurance_percent,
                interest_rate = %rates.interest_rate,
                "loaded rate defaults"
            );
            Loaded::Fetched(rates)
        }
        Err(e) => {
            error!("Error loading defaults: {}", e);
            Loaded::Fallback {
                value: RateDefaults::default(),
                reason: e.to_string(),
            }
        }
    };

    let message_rules = match load_valid_rules(provider).await {
        Ok(rules) => {
            info!(count = rules.len(), "loaded DSCR message rules");
            Loaded::Fetched(rules)
        }
        Err(e) => {
            error!("Error loading DSCR messages: {}", e);
            Loaded::Fallback {
                value: fallback_message_rules(),
                reason: e.to_string(),
            }
        }
    };

    LoadedDefaults {
        rates,
        message_rules,
    }
}

async fn load_valid_rules(
    provider: &dyn DefaultsProvider,
) -> Result<Vec<DscrMessageRule>, ProviderError> {
    let rules = provider.message_rules().await?;
    validate_message_rules(&rules)?;
    Ok(rules)
}

/// Serves the fixed fallback constants without touching any data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDefaultsProvider;

#[async_trait]
impl DefaultsProvider for BuiltinDefaultsProvider {
    async fn rate_defaults(&self) -> Result<RateDefaults, ProviderError> {
        Ok(RateDefaults::default())
    }

    async fn message_rules(&self) -> Result<Vec<DscrMessageRule>, ProviderError> {
        Ok(fallback_message_rules())
    }
}
