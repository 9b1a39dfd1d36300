//! Point-in-time lookup of versioned state rule configurations.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{PenaltyInterestConfig, ThresholdRule};

/// Errors raised while resolving a state's configuration. Fatal to that
/// state only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleResolverError {
    #[error("no {kind} configuration for {state_code} effective on {date}")]
    ConfigNotFound {
        kind: &'static str,
        state_code: String,
        date: NaiveDate,
    },

    #[error("{count} overlapping {kind} configurations for {state_code} effective on {date}")]
    ConfigConflict {
        kind: &'static str,
        state_code: String,
        date: NaiveDate,
        count: usize,
    },
}

/// A configuration record valid over an inclusive date range.
pub trait Versioned {
    const KIND: &'static str;

    fn state_code(&self) -> &str;
    fn effective_from(&self) -> NaiveDate;
    fn effective_to(&self) -> Option<NaiveDate>;

    fn covers(
        &self,
        date: NaiveDate,
    ) -> bool {
        date >= self.effective_from() && self.effective_to().is_none_or(|to| date <= to)
    }
}

impl Versioned for ThresholdRule {
    const KIND: &'static str = "threshold";

    fn state_code(&self) -> &str {
        &self.state_code
    }
    fn effective_from(&self) -> NaiveDate {
        self.effective_from
    }
    fn effective_to(&self) -> Option<NaiveDate> {
        self.effective_to
    }
}

impl Versioned for PenaltyInterestConfig {
    const KIND: &'static str = "penalty/interest";

    fn state_code(&self) -> &str {
        &self.state_code
    }
    fn effective_from(&self) -> NaiveDate {
        self.effective_from
    }
    fn effective_to(&self) -> Option<NaiveDate> {
        self.effective_to
    }
}

/// Records of one kind, grouped per state and sorted by effective date.
#[derive(Debug, Clone)]
pub struct VersionedRules<T> {
    by_state: BTreeMap<String, Vec<T>>,
}

impl<T: Versioned + Clone> VersionedRules<T> {
    pub fn new(records: &[T]) -> Self {
        let mut by_state: BTreeMap<String, Vec<T>> = BTreeMap::new();
        for record in records {
            by_state
                .entry(record.state_code().to_string())
                .or_default()
                .push(record.clone());
        }
        for versions in by_state.values_mut() {
            versions.sort_by_key(|r| r.effective_from());
        }
        Self { by_state }
    }

    /// The single record for `state_code` whose range contains `date`.
    pub fn resolve(
        &self,
        state_code: &str,
        date: NaiveDate,
    ) -> Result<&T, RuleResolverError> {
        let versions = self.by_state.get(state_code).map(Vec::as_slice).unwrap_or(&[]);

        let mut matches = versions
            .iter()
            .take_while(|r| r.effective_from() <= date)
            .filter(|r| r.covers(date));

        let first = matches.next().ok_or_else(|| RuleResolverError::ConfigNotFound {
            kind: T::KIND,
            state_code: state_code.to_string(),
            date,
        })?;

        let extra = matches.count();
        if extra > 0 {
            return Err(RuleResolverError::ConfigConflict {
                kind: T::KIND,
                state_code: state_code.to_string(),
                date,
                count: extra + 1,
            });
        }

        Ok(first)
    }
}

/// Read-only rule store for one analysis run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    thresholds: VersionedRules<ThresholdRule>,
    penalty_interest: VersionedRules<PenaltyInterestConfig>,
}

impl RuleSet {
    pub fn new(
        threshold_rules: &[ThresholdRule],
        penalty_interest_configs: &[PenaltyInterestConfig],
    ) -> Self {
        Self {
            thresholds: VersionedRules::new(threshold_rules),
            penalty_interest: VersionedRules::new(penalty_interest_configs),
        }
    }

    pub fn resolve_threshold(
        &self,
        state_code: &str,
        date: NaiveDate,
    ) -> Result<&ThresholdRule, RuleResolverError> {
        self.thresholds.resolve(state_code, date)
    }

    pub fn resolve_penalty_interest(
        &self,
        state_code: &str,
        date: NaiveDate,
    ) -> Result<&PenaltyInterestConfig, RuleResolverError> {
        self.penalty_interest.resolve(state_code, date)
    }
}
