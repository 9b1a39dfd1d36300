use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::penalty_rule::PenaltyKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    /// Amount per kind before any combined cap.
    pub items: BTreeMap<PenaltyKind, Decimal>,
    /// Zero or negative; the reduction a combined cap imposed.
    pub combined_cap_adjustment: Decimal,
    pub total: Decimal,
}

/// Estimated unpaid liability for one state and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiabilityResult {
    /// Sales the tax rate was applied to.
    pub taxable_base: Decimal,
    pub tax_rate: Decimal,
    pub base_tax: Decimal,
    pub interest: Decimal,
    /// Annualised rate the interest figure corresponds to.
    pub effective_interest_rate: Decimal,
    pub penalties: PenaltyBreakdown,
    pub total_liability: Decimal,
    pub due_date: NaiveDate,
    pub days_outstanding: i64,
    pub years_outstanding: Decimal,
    /// Accrual suppressed because the business was already registered.
    pub registered: bool,
}

impl LiabilityResult {
    pub fn zero(due_date: NaiveDate) -> Self {
        Self {
            taxable_base: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            base_tax: Decimal::ZERO,
            interest: Decimal::ZERO,
            effective_interest_rate: Decimal::ZERO,
            penalties: PenaltyBreakdown::default(),
            total_liability: Decimal::ZERO,
            due_date,
            days_outstanding: 0,
            years_outstanding: Decimal::ZERO,
            registered: false,
        }
    }
}
