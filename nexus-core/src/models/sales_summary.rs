use std::ops::{Add, AddAssign};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, validate_state_code};

/// The figures a threshold test and a liability computation look at.
///
/// Shared by year summaries, month summaries, rolling windows and the
/// running totals of a cumulative series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFigures {
    pub taxable_sales: Decimal,
    /// Gross marketplace-channel sales.
    pub marketplace_sales: Decimal,
    /// Taxable portion of the marketplace-channel sales.
    pub marketplace_taxable_sales: Decimal,
    pub transaction_count: u64,
    pub marketplace_transaction_count: u64,
}

impl SalesFigures {
    /// Sales that count toward a threshold (and toward base tax).
    ///
    /// With the marketplace exclusion on, the taxable part of
    /// facilitator-collected sales is removed. The result never goes below zero.
    pub fn comparison_sales(
        &self,
        exclude_marketplace: bool,
    ) -> Decimal {
        if exclude_marketplace {
            (self.taxable_sales - self.marketplace_taxable_sales).max(Decimal::ZERO)
        } else {
            self.taxable_sales
        }
    }

    /// Transactions that count toward a threshold.
    pub fn comparison_transactions(
        &self,
        exclude_marketplace: bool,
    ) -> u64 {
        if exclude_marketplace {
            self.transaction_count
                .saturating_sub(self.marketplace_transaction_count)
        } else {
            self.transaction_count
        }
    }

    /// Per-figure maximum of two sets of figures.
    pub fn max_of(
        &self,
        other: &SalesFigures,
    ) -> SalesFigures {
        SalesFigures {
            taxable_sales: self.taxable_sales.max(other.taxable_sales),
            marketplace_sales: self.marketplace_sales.max(other.marketplace_sales),
            marketplace_taxable_sales: self
                .marketplace_taxable_sales
                .max(other.marketplace_taxable_sales),
            transaction_count: self.transaction_count.max(other.transaction_count),
            marketplace_transaction_count: self
                .marketplace_transaction_count
                .max(other.marketplace_transaction_count),
        }
    }
}

impl Add for SalesFigures {
    type Output = SalesFigures;

    fn add(
        self,
        rhs: SalesFigures,
    ) -> SalesFigures {
        SalesFigures {
            taxable_sales: self.taxable_sales + rhs.taxable_sales,
            marketplace_sales: self.marketplace_sales + rhs.marketplace_sales,
            marketplace_taxable_sales: self.marketplace_taxable_sales
                + rhs.marketplace_taxable_sales,
            transaction_count: self.transaction_count + rhs.transaction_count,
            marketplace_transaction_count: self.marketplace_transaction_count
                + rhs.marketplace_transaction_count,
        }
    }
}

impl AddAssign for SalesFigures {
    fn add_assign(
        &mut self,
        rhs: SalesFigures,
    ) {
        *self = *self + rhs;
    }
}

/// Sales for one state over one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateYearSummary {
    pub state_code: String,
    pub year: i32,
    pub total_sales: Decimal,
    pub exempt_sales: Decimal,
    pub taxable_sales: Decimal,
    pub direct_sales: Decimal,
    pub marketplace_sales: Decimal,
    /// Marketplace sales less their exempt amounts.
    pub marketplace_taxable_sales: Decimal,
    pub transaction_count: u64,
    pub marketplace_transaction_count: u64,
}

impl StateYearSummary {
    pub fn figures(&self) -> SalesFigures {
        SalesFigures {
            taxable_sales: self.taxable_sales,
            marketplace_sales: self.marketplace_sales,
            marketplace_taxable_sales: self.marketplace_taxable_sales,
            transaction_count: self.transaction_count,
            marketplace_transaction_count: self.marketplace_transaction_count,
        }
    }

    /// Checks the summary invariants for summaries supplied directly by a caller.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_state_code(&self.state_code)?;

        for (field, value) in [
            ("total_sales", self.total_sales),
            ("exempt_sales", self.exempt_sales),
            ("taxable_sales", self.taxable_sales),
            ("direct_sales", self.direct_sales),
            ("marketplace_sales", self.marketplace_sales),
            ("marketplace_taxable_sales", self.marketplace_taxable_sales),
        ] {
            if value < Decimal::ZERO {
                return Err(ValidationError::NegativeAmount {
                    state_code: self.state_code.clone(),
                    field,
                    value,
                });
            }
        }

        if self.taxable_sales != self.total_sales - self.exempt_sales {
            return Err(ValidationError::TaxableMismatch {
                state_code: self.state_code.clone(),
                year: self.year,
                taxable: self.taxable_sales,
                total: self.total_sales,
                exempt: self.exempt_sales,
            });
        }

        if self.direct_sales + self.marketplace_sales != self.total_sales {
            return Err(ValidationError::ChannelMismatch {
                state_code: self.state_code.clone(),
                year: self.year,
                direct: self.direct_sales,
                marketplace: self.marketplace_sales,
                total: self.total_sales,
            });
        }

        if self.marketplace_taxable_sales > self.marketplace_sales
            || self.marketplace_taxable_sales > self.taxable_sales
        {
            return Err(ValidationError::MarketplaceTaxableExceedsSales {
                state_code: self.state_code.clone(),
                year: self.year,
                marketplace_taxable: self.marketplace_taxable_sales,
            });
        }

        if self.marketplace_transaction_count > self.transaction_count {
            return Err(ValidationError::MarketplaceCountExceedsTotal {
                state_code: self.state_code.clone(),
                year: self.year,
            });
        }

        Ok(())
    }
}

/// Sales for one state over one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMonthSummary {
    pub state_code: String,
    pub year: i32,
    /// 1-12.
    pub month: u32,
    pub figures: SalesFigures,
}

/// Running totals for a state-year as of the end of `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub running: SalesFigures,
}
