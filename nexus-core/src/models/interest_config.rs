use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One date-bounded interest period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestPeriod {
    pub start: NaiveDate,
    /// Inclusive end; the last period may be open-ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    pub annual_rate: Decimal,
}

/// The rate (or rates) an unpaid balance accrues at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterestRate {
    Annual { rate: Decimal },
    Monthly { rate: Decimal },
    /// Ordered, non-overlapping, contiguous periods.
    Periods { periods: Vec<InterestPeriod> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMethod {
    Simple,
    CompoundMonthly,
    CompoundDaily,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestConfig {
    pub rate: InterestRate,
    pub method: InterestMethod,
    /// Floor applied whenever computed interest is positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_amount: Option<Decimal>,
}
