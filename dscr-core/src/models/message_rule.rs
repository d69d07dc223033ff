use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when no rule covers the computed ratio.
pub const NO_MATCHING_RANGE_MESSAGE: &str = "No matching DSCR range found.";

/// Errors found when checking a set of message rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageRuleError {
    #[error("no DSCR message rules provided")]
    Empty,

    #[error("rule {index} has min {min} above max {max}")]
    InvertedRange {
        index: usize,
        min: Decimal,
        max: Decimal,
    },

    #[error("rules {first} and {second} overlap")]
    Overlapping { first: usize, second: usize },
}

/// One DSCR range and the text shown for it. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscrMessageRule {
    pub min: Decimal,
    pub max: Decimal,
    pub message: String,
}

impl DscrMessageRule {
    pub fn new(
        min: Decimal,
        max: Decimal,
        message: impl Into<String>,
    ) -> Self {
        Self {
            min,
            max,
            message: message.into(),
        }
    }

    pub fn contains(
        &self,
        ratio: Decimal,
    ) -> bool {
        self.min <= ratio && ratio <= self.max
    }
}

/// The four built-in ranges used when no rule set can be loaded.
pub fn fallback_message_rules() -> Vec<DscrMessageRule> {
    vec![
        DscrMessageRule::new(
            dec!(1.25),
            dec!(9999),
            "Your ratios are as good as they get, you are in great shape to qualify",
        ),
        DscrMessageRule::new(
            dec!(1.0),
            dec!(1.249),
            "You meet the requirements for most loans",
        ),
        DscrMessageRule::new(
            dec!(0.75),
            dec!(0.999),
            "Your rent does not cover your payment, but we may still be able to qualify you for this loan (rates are likely going to be higher due to negative cash flow)",
        ),
        DscrMessageRule::new(
            dec!(0),
            dec!(0.749),
            "Your rent is significantly below your mortgage payment. There is a slight chance we can still proceed, contact our office to discuss details",
        ),
    ]
}

/// Checks that a rule set is non-empty, that every range is ordered and that
/// no two ranges share a value.
pub fn validate_message_rules(rules: &[DscrMessageRule]) -> Result<(), MessageRuleError> {
    if rules.is_empty() {
        return Err(MessageRuleError::Empty);
    }

    for (index, rule) in rules.iter().enumerate() {
        if rule.min > rule.max {
            return Err(MessageRuleError::InvertedRange {
                index,
                min: rule.min,
                max: rule.max,
            });
        }
    }

    let mut order: Vec<usize> = (0..rules.len()).collect();
    order.sort_by(|a, b| rules[*a].min.cmp(&rules[*b].min));
    for pair in order.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if rules[second].min <= rules[first].max {
            return Err(MessageRuleError::Overlapping { first, second });
        }
    }

    Ok(())
}
