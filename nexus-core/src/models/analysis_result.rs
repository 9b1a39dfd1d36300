use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::liability_result::LiabilityResult;
use super::nexus_result::NexusResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigNotFound,
    ConfigConflict,
    UnknownPenaltyShape,
    MalformedInterestConfig,
    MissingTaxRate,
}

/// A failure attached to a state or state-year instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMarker {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearResult {
    pub year: i32,
    pub nexus: NexusResult,
    /// Absent when the liability calculation failed; see `error`.
    pub liability: Option<LiabilityResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMarker>,
    /// The resolved marketplace-exclusion flag differs from the prior year's.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub marketplace_exclusion_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAnalysis {
    pub years: Vec<YearResult>,
    /// Set when the state could not be processed to completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMarker>,
}

impl StateAnalysis {
    /// Whether any part of this state needs manual review.
    pub fn is_flagged(&self) -> bool {
        self.error.is_some() || self.years.iter().any(|y| y.error.is_some())
    }

    pub fn has_nexus(&self) -> bool {
        self.years.iter().any(|y| y.nexus.has_nexus())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub states_analyzed: usize,
    pub states_with_nexus: usize,
    pub states_approaching: usize,
    pub states_flagged: usize,
    pub total_base_tax: Decimal,
    pub total_interest: Decimal,
    pub total_penalties: Decimal,
    pub total_liability: Decimal,
}

impl AnalysisSummary {
    /// `"48 of 50 states computed, 2 flagged for manual review"`.
    pub fn headline(&self) -> String {
        format!(
            "{} of {} states computed, {} flagged for manual review",
            self.states_analyzed.saturating_sub(self.states_flagged),
            self.states_analyzed,
            self.states_flagged
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub as_of_date: NaiveDate,
    pub per_state: BTreeMap<String, StateAnalysis>,
    pub summary: AnalysisSummary,
}
