//! Defaults provider backed by a directory of JSON (and optionally CSV)
//! documents.
//!
//! | File                 | Shape                                                            |
//! |----------------------|------------------------------------------------------------------|
//! | `Tax_ins.json`       | `{"defaults":{"taxes":{"percentage":n},"insurance":{"percentage":n}}}` |
//! | `rates.json`         | `{"rates":[{"rate":n, ...}, ...]}`, first entry used             |
//! | `dscr-messages.json` | `{"dscrMessages":[{"min":n,"max":n,"message":s}, ...]}`         |
//! | `dscr-messages.csv`  | `min,max,message`, read only when the JSON file is absent        |

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use dscr_core::defaults::{
    DefaultsProvider, DefaultsSource, ProviderError, ProviderFactory, RateDefaults,
};
use dscr_core::{DscrMessageRule, validate_message_rules};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::loader::{BOUND_SCALE, MessageRuleLoader, MessageRuleLoaderError};

pub const TAX_INS_FILE: &str = "Tax_ins.json";
pub const RATES_FILE: &str = "rates.json";
pub const MESSAGES_JSON_FILE: &str = "dscr-messages.json";
pub const MESSAGES_CSV_FILE: &str = "dscr-messages.csv";

#[derive(Debug, Deserialize)]
struct TaxInsDocument {
    defaults: Option<TaxInsDefaults>,
}

#[derive(Debug, Deserialize)]
struct TaxInsDefaults {
    taxes: PercentageEntry,
    insurance: PercentageEntry,
}

#[derive(Debug, Deserialize)]
struct PercentageEntry {
    percentage: serde_json::Number,
}

#[derive(Debug, Deserialize)]
struct RatesDocument {
    #[serde(default)]
    rates: Vec<RateEntry>,
}

#[derive(Debug, Deserialize)]
struct RateEntry {
    rate: serde_json::Number,
}

#[derive(Debug, Deserialize)]
struct MessagesDocument {
    #[serde(rename = "dscrMessages")]
    dscr_messages: Option<Vec<MessageEntry>>,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    min: serde_json::Number,
    max: serde_json::Number,
    message: String,
}

/// Reads defaults from the files of one directory on every call.
#[derive(Debug, Clone)]
pub struct FileDefaultsProvider {
    dir: PathBuf,
}

impl FileDefaultsProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        file: &str,
    ) -> Result<T, ProviderError> {
        let path = self.dir.join(file);
        let text = read_file(&path).await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Parse(format!("{}: {}", path.display(), e)))
    }

    async fn json_rules(&self) -> Result<Option<Vec<DscrMessageRule>>, ProviderError> {
        let path = self.dir.join(MESSAGES_JSON_FILE);
        if !exists(&path).await? {
            return Ok(None);
        }

        let document: MessagesDocument = self.read_json(MESSAGES_JSON_FILE).await?;
        let entries = document.dscr_messages.ok_or_else(|| {
            ProviderError::MissingData(format!(
                "DSCR messages JSON structure is not as expected: {}",
                path.display()
            ))
        })?;

        let rules = entries
            .into_iter()
            .map(|entry| -> Result<DscrMessageRule, ProviderError> {
                Ok(DscrMessageRule::new(
                    to_decimal(&entry.min)?.round_dp(BOUND_SCALE),
                    to_decimal(&entry.max)?.round_dp(BOUND_SCALE),
                    entry.message,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(rules))
    }

    async fn csv_rules(&self) -> Result<Vec<DscrMessageRule>, ProviderError> {
        let path = self.dir.join(MESSAGES_CSV_FILE);
        let text = read_file(&path).await?;
        MessageRuleLoader::load(text.as_bytes()).map_err(|e| match e {
            MessageRuleLoaderError::CsvParse(msg) => {
                ProviderError::Parse(format!("{}: {}", path.display(), msg))
            }
            MessageRuleLoaderError::InvalidRules(err) => ProviderError::InvalidRules(err),
        })
    }
}

#[async_trait]
impl DefaultsProvider for FileDefaultsProvider {
    async fn rate_defaults(&self) -> Result<RateDefaults, ProviderError> {
        let tax_ins: TaxInsDocument = self.read_json(TAX_INS_FILE).await?;
        let defaults = tax_ins.defaults.ok_or_else(|| {
            ProviderError::MissingData("Tax and insurance defaults not found".to_string())
        })?;

        let rates: RatesDocument = self.read_json(RATES_FILE).await?;
        let first = rates
            .rates
            .first()
            .ok_or_else(|| ProviderError::MissingData("Interest rate not found".to_string()))?;

        let loaded = RateDefaults {
            taxes_percent: to_decimal(&defaults.taxes.percentage)?,
            insurance_percent: to_decimal(&defaults.insurance.percentage)?,
            interest_rate: to_decimal(&first.rate)?,
        };
        debug!(dir = %self.dir.display(), ?loaded, "read rate defaults");
        Ok(loaded)
    }

    async fn message_rules(&self) -> Result<Vec<DscrMessageRule>, ProviderError> {
        let rules = match self.json_rules().await? {
            Some(rules) => rules,
            None => {
                debug!(dir = %self.dir.display(), "no JSON message file; reading CSV");
                self.csv_rules().await?
            }
        };
        validate_message_rules(&rules)?;
        Ok(rules)
    }
}

/// Reads a JSON number through its text form, so `1.25` stays exactly 1.25.
fn to_decimal(number: &serde_json::Number) -> Result<Decimal, ProviderError> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| ProviderError::Parse(format!("number {text}: {e}")))
}

async fn read_file(path: &Path) -> Result<String, ProviderError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProviderError::Io(format!("{}: {}", path.display(), e)))
}

async fn exists(path: &Path) -> Result<bool, ProviderError> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProviderError::Io(format!("{}: {}", path.display(), e))),
    }
}

/// Factory for [`FileDefaultsProvider`]; `location` is the directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProviderFactory;

impl FileProviderFactory {
    pub const BACKEND: &'static str = "file";
}

#[async_trait]
impl ProviderFactory for FileProviderFactory {
    fn backend_name(&self) -> &'static str {
        Self::BACKEND
    }

    async fn create(
        &self,
        source: &DefaultsSource,
    ) -> Result<Box<dyn DefaultsProvider>, ProviderError> {
        if source.location.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "file backend requires a defaults directory".to_string(),
            ));
        }

        let dir = PathBuf::from(&source.location);
        let metadata = tokio::fs::metadata(&dir).await.map_err(|e| {
            ProviderError::Configuration(format!("defaults directory {}: {}", dir.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(ProviderError::Configuration(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        Ok(Box::new(FileDefaultsProvider::new(dir)))
    }
}
