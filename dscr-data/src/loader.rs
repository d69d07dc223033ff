use std::io::Read;

use dscr_core::{DscrMessageRule, MessageRuleError, validate_message_rules};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Fraction digits kept for rule bounds.
pub const BOUND_SCALE: u32 = 6;

/// Errors that can occur when loading DSCR message rules.
#[derive(Debug, Error)]
pub enum MessageRuleLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid rule set: {0}")]
    InvalidRules(#[from] MessageRuleError),
}

impl From<csv::Error> for MessageRuleLoaderError {
    fn from(err: csv::Error) -> Self {
        MessageRuleLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from a DSCR messages CSV file.
///
/// - `min`: lower bound of the DSCR range, inclusive
/// - `max`: upper bound of the DSCR range, inclusive
/// - `message`: text shown when the ratio falls in the range
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MessageRuleRecord {
    #[serde(deserialize_with = "deserialize_trimmed_decimal")]
    pub min: Decimal,
    #[serde(deserialize_with = "deserialize_trimmed_decimal")]
    pub max: Decimal,
    pub message: String,
}

impl From<MessageRuleRecord> for DscrMessageRule {
    fn from(record: MessageRuleRecord) -> Self {
        DscrMessageRule::new(
            record.min.round_dp(BOUND_SCALE),
            record.max.round_dp(BOUND_SCALE),
            record.message.trim(),
        )
    }
}

fn deserialize_trimmed_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim().parse::<Decimal>().map_err(serde::de::Error::custom)
}

/// Loader for DSCR message rules from CSV files.
///
/// Rows keep their file order, which is the order the calculator scans them
/// in; the first range containing a ratio wins.
pub struct MessageRuleLoader;

impl MessageRuleLoader {
    /// Parse message rule records from a CSV reader with a
    /// `min,max,message` header.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<MessageRuleRecord>, MessageRuleLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: MessageRuleRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Parse and validate a complete rule set.
    pub fn load<R: Read>(reader: R) -> Result<Vec<DscrMessageRule>, MessageRuleLoaderError> {
        let rules: Vec<DscrMessageRule> = Self::parse(reader)?
            .into_iter()
            .map(DscrMessageRule::from)
            .collect();
        validate_message_rules(&rules)?;
        Ok(rules)
    }
}
