use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, validate_state_code};

/// Which historical window a threshold is measured over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookbackPeriod {
    CurrentCalendarYear,
    CurrentOrPreviousCalendarYear,
    #[serde(rename = "rolling_12_months")]
    Rolling12Months,
}

/// How the revenue and transaction tests combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    And,
    Or,
}

/// Economic nexus thresholds for one state over one effective-date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub state_code: String,
    pub effective_from: NaiveDate,
    /// Inclusive end of the range; open-ended when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDate>,
    pub lookback: LookbackPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_threshold: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_threshold: Option<u64>,
    pub combinator: Combinator,
    /// When set, marketplace-facilitator sales are removed from both the
    /// threshold test and the liability base.
    pub marketplace_exclusion: bool,
}

impl ThresholdRule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_state_code(&self.state_code)?;

        if self.revenue_threshold.is_none() && self.transaction_threshold.is_none() {
            return Err(ValidationError::MissingThreshold {
                state_code: self.state_code.clone(),
                effective_from: self.effective_from,
            });
        }

        if let Some(to) = self.effective_to {
            if to < self.effective_from {
                return Err(ValidationError::InvertedRange {
                    state_code: self.state_code.clone(),
                    effective_from: self.effective_from,
                    effective_to: to,
                });
            }
        }

        Ok(())
    }
}
