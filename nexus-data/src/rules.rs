use std::collections::BTreeSet;
use std::io::Read;

use async_trait::async_trait;
use nexus_core::{
    PenaltyInterestConfig, RepositoryError, RuleRepository, ThresholdRule, ValidationError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RuleBookError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid threshold rule: {0}")]
    Validation(#[from] ValidationError),
}

/// Canonical rules document.
///
/// ```json
/// {
///   "threshold_rules": [ ... ],
///   "penalty_interest_configs": [ ... ]
/// }
/// ```
///
/// Decoding then re-encoding a canonical document yields the same JSON
/// structure: decimals stay strings with their scale, absent optionals stay
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBook {
    #[serde(default)]
    pub threshold_rules: Vec<ThresholdRule>,
    #[serde(default)]
    pub penalty_interest_configs: Vec<PenaltyInterestConfig>,
}

impl RuleBook {
    pub fn from_json<R: Read>(reader: R) -> Result<Self, RuleBookError> {
        let book: RuleBook = serde_json::from_reader(reader)?;
        for rule in &book.threshold_rules {
            rule.validate()?;
        }
        debug!(
            threshold_rules = book.threshold_rules.len(),
            penalty_interest_configs = book.penalty_interest_configs.len(),
            "rule book loaded"
        );
        Ok(book)
    }

    pub fn to_json(&self) -> Result<String, RuleBookError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// [`RuleRepository`] over an in-memory [`RuleBook`].
#[derive(Debug, Clone, Default)]
pub struct JsonRuleRepository {
    book: RuleBook,
}

impl JsonRuleRepository {
    pub fn new(book: RuleBook) -> Self {
        Self { book }
    }

    pub fn from_json<R: Read>(reader: R) -> Result<Self, RuleBookError> {
        RuleBook::from_json(reader).map(Self::new)
    }
}

#[async_trait]
impl RuleRepository for JsonRuleRepository {
    async fn states(&self) -> Result<Vec<String>, RepositoryError> {
        let states: BTreeSet<&str> = self
            .book
            .threshold_rules
            .iter()
            .map(|r| r.state_code.as_str())
            .chain(
                self.book
                    .penalty_interest_configs
                    .iter()
                    .map(|c| c.state_code.as_str()),
            )
            .collect();
        Ok(states.into_iter().map(str::to_string).collect())
    }

    async fn threshold_rules(&self, state_code: &str) -> Result<Vec<ThresholdRule>, RepositoryError> {
        Ok(self
            .book
            .threshold_rules
            .iter()
            .filter(|r| r.state_code == state_code)
            .cloned()
            .collect())
    }

    async fn penalty_interest_configs(
        &self,
        state_code: &str,
    ) -> Result<Vec<PenaltyInterestConfig>, RepositoryError> {
        Ok(self
            .book
            .penalty_interest_configs
            .iter()
            .filter(|c| c.state_code == state_code)
            .cloned()
            .collect())
    }
}
