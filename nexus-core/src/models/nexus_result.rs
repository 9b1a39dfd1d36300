use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NexusStatus {
    NoNexus,
    Approaching,
    HasNexus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NexusType {
    Physical,
    Economic,
    Both,
    None,
}

impl NexusType {
    pub fn from_flags(
        economic: bool,
        physical: bool,
    ) -> Self {
        match (economic, physical) {
            (true, true) => Self::Both,
            (true, false) => Self::Economic,
            (false, true) => Self::Physical,
            (false, false) => Self::None,
        }
    }

    pub fn is_economic(&self) -> bool {
        matches!(self, Self::Economic | Self::Both)
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Self::Physical | Self::Both)
    }
}

/// Nexus determination for one state and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NexusResult {
    pub status: NexusStatus,
    pub nexus_type: NexusType,
    pub first_crossed_date: Option<NaiveDate>,
    /// Revenue percent when a revenue threshold is configured, otherwise
    /// transaction percent.
    pub threshold_percent: Decimal,
    pub revenue_percent: Option<Decimal>,
    pub transaction_percent: Option<Decimal>,
    /// Sales the thresholds were compared against.
    pub comparison_sales: Decimal,
    pub comparison_transactions: u64,
    /// Whether the economic test itself was satisfied this year.
    pub threshold_met: bool,
    /// `HasNexus` forced by nexus established in an earlier year.
    pub carried_forward: bool,
    pub marketplace_exclusion: bool,
}

impl NexusResult {
    pub fn has_nexus(&self) -> bool {
        self.status == NexusStatus::HasNexus
    }
}
