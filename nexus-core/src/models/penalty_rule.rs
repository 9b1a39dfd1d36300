use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::interest_config::InterestConfig;

/// Rate-of-tax penalty, optionally floored, capped or escalated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRatePenalty {
    pub rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_amount: Option<Decimal>,
    /// Take the larger of the rate amount and `minimum_amount` instead of
    /// adding them.
    pub greater_of: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_rate: Option<Decimal>,
    /// `additional_rate` applies once days outstanding exceed this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_after_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFeePenalty {
    pub amount: Decimal,
}

fn default_period_days() -> i64 {
    30
}

/// `rate_per_period` for every started period, capped at `max_rate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerPeriodPenalty {
    pub rate_per_period: Decimal,
    #[serde(default = "default_period_days")]
    pub period_days: i64,
    pub max_rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_fee: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerDayPenalty {
    pub rate_per_day: Decimal,
    pub max_rate: Decimal,
}

/// One day-range of a tiered penalty. `max_days` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyTier {
    pub min_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_days: Option<i64>,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredPenalty {
    pub tiers: Vec<PenaltyTier>,
}

/// Minimum amount that takes effect once days outstanding reach `after_days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalatingMinimum {
    pub after_days: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePlusPerPeriodPenalty {
    pub base_rate: Decimal,
    pub rate_per_period: Decimal,
    #[serde(default = "default_period_days")]
    pub period_days: i64,
    pub max_rate: Decimal,
    #[serde(default)]
    pub minimums: Vec<EscalatingMinimum>,
}

/// The six penalty shapes states use, discriminated by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PenaltyRule {
    FlatRate(FlatRatePenalty),
    FlatFee(FlatFeePenalty),
    PerPeriod(PerPeriodPenalty),
    PerDay(PerDayPenalty),
    Tiered(TieredPenalty),
    BasePlusPerPeriod(BasePlusPerPeriodPenalty),
    /// Any discriminator this build does not know. Rejected at calculation time.
    ///
    /// The original fields are discarded, so this encodes back as
    /// `{"type": "unknown"}`. Documents holding one do not round-trip.
    #[serde(other)]
    Unknown,
}

impl PenaltyRule {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::FlatRate(_) => "flat_rate",
            Self::FlatFee(_) => "flat_fee",
            Self::PerPeriod(_) => "per_period",
            Self::PerDay(_) => "per_day",
            Self::Tiered(_) => "tiered",
            Self::BasePlusPerPeriod(_) => "base_plus_per_period",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    LateFiling,
    LatePayment,
    Negligence,
    Fraud,
    EFilingFailure,
    OperatingWithoutPermit,
}

impl PenaltyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LateFiling => "late_filing",
            Self::LatePayment => "late_payment",
            Self::Negligence => "negligence",
            Self::Fraud => "fraud",
            Self::EFilingFailure => "e_filing_failure",
            Self::OperatingWithoutPermit => "operating_without_permit",
        }
    }
}

/// Caps the sum of the named penalty kinds at `max_combined_rate` of base tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedCap {
    pub max_combined_rate: Decimal,
    pub applies_to: Vec<PenaltyKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_filing: Option<PenaltyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_payment: Option<PenaltyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negligence: Option<PenaltyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraud: Option<PenaltyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_filing_failure: Option<PenaltyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_without_permit: Option<PenaltyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_cap: Option<CombinedCap>,
}

impl PenaltySet {
    /// Every configured rule with its kind, in [`PenaltyKind`] order.
    pub fn rules(&self) -> Vec<(PenaltyKind, &PenaltyRule)> {
        [
            (PenaltyKind::LateFiling, &self.late_filing),
            (PenaltyKind::LatePayment, &self.late_payment),
            (PenaltyKind::Negligence, &self.negligence),
            (PenaltyKind::Fraud, &self.fraud),
            (PenaltyKind::EFilingFailure, &self.e_filing_failure),
            (PenaltyKind::OperatingWithoutPermit, &self.operating_without_permit),
        ]
        .into_iter()
        .filter_map(|(kind, rule)| rule.as_ref().map(|r| (kind, r)))
        .collect()
    }
}

/// Interest and penalty rules for one state over one effective-date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyInterestConfig {
    pub state_code: String,
    pub effective_from: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDate>,
    pub interest: InterestConfig,
    pub penalties: PenaltySet,
}
