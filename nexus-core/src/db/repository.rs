use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PenaltyInterestConfig, ThresholdRule};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Invalid rule data: {0}")]
    InvalidData(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Source of versioned state rules, keyed by state code.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// State codes with at least one rule of either kind, ascending.
    async fn states(&self) -> Result<Vec<String>, RepositoryError>;

    async fn threshold_rules(&self, state_code: &str) -> Result<Vec<ThresholdRule>, RepositoryError>;

    async fn penalty_interest_configs(
        &self,
        state_code: &str,
    ) -> Result<Vec<PenaltyInterestConfig>, RepositoryError>;
}

/// Every rule a repository holds, fetched once per analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSnapshot {
    pub threshold_rules: Vec<ThresholdRule>,
    pub penalty_interest_configs: Vec<PenaltyInterestConfig>,
}

impl RuleSnapshot {
    /// # Errors
    ///
    /// Returns the first [`RepositoryError`] the repository reports, or
    /// [`RepositoryError::InvalidData`] for a threshold rule without thresholds.
    pub async fn load(repo: &dyn RuleRepository) -> Result<Self, RepositoryError> {
        let mut snapshot = Self::default();
        for state in repo.states().await? {
            let thresholds = repo.threshold_rules(&state).await?;
            for rule in &thresholds {
                rule.validate()
                    .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;
            }
            snapshot.threshold_rules.extend(thresholds);
            snapshot
                .penalty_interest_configs
                .extend(repo.penalty_interest_configs(&state).await?);
        }
        Ok(snapshot)
    }
}
