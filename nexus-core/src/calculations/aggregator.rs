//! Reduction of validated transactions into per-state sales aggregates.
//!
//! Produces three views of the same data, all ordered by state then time:
//!
//! | View | Granularity | Used by |
//! |------|-------------|---------|
//! | [`StateYearSummary`] | state, year | threshold tests, base tax |
//! | [`CumulativePoint`] series | state, year, transaction date | first-crossed date |
//! | [`StateMonthSummary`] | state, year, month | rolling lookback windows |

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::common::month_end;
use crate::models::{
    CumulativePoint, SalesChannel, SalesFigures, StateMonthSummary, StateYearSummary,
    Transaction, ValidationError,
};

/// Key for per-state-year lookups.
pub type StateYear = (String, i32);

/// Aggregator output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedSales {
    pub summaries: Vec<StateYearSummary>,
    pub cumulative: BTreeMap<StateYear, Vec<CumulativePoint>>,
    pub monthly: Vec<StateMonthSummary>,
}

/// Sales summed over a window of consecutive months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    /// Last day of the window's final month.
    pub end_date: NaiveDate,
    pub figures: SalesFigures,
}

#[derive(Debug, Default)]
struct YearTotals {
    total: Decimal,
    exempt: Decimal,
    direct: Decimal,
    marketplace: Decimal,
    marketplace_taxable: Decimal,
    count: u64,
    marketplace_count: u64,
}

fn figures_of(tx: &Transaction) -> SalesFigures {
    let marketplace = tx.channel == SalesChannel::Marketplace;
    SalesFigures {
        taxable_sales: tx.taxable_amount(),
        marketplace_sales: if marketplace { tx.amount } else { Decimal::ZERO },
        marketplace_taxable_sales: if marketplace {
            tx.taxable_amount()
        } else {
            Decimal::ZERO
        },
        transaction_count: 1,
        marketplace_transaction_count: u64::from(marketplace),
    }
}

pub struct SalesAggregator;

impl SalesAggregator {
    /// Validate and reduce transactions.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered; nothing is
    /// aggregated from a batch containing a malformed record.
    pub fn aggregate(transactions: &[Transaction]) -> Result<AggregatedSales, ValidationError> {
        for tx in transactions {
            tx.validate()?;
        }

        let mut years: BTreeMap<StateYear, YearTotals> = BTreeMap::new();
        let mut months: BTreeMap<(String, i32, u32), SalesFigures> = BTreeMap::new();
        let mut days: BTreeMap<StateYear, BTreeMap<NaiveDate, SalesFigures>> = BTreeMap::new();

        for tx in transactions {
            let year = tx.date.year();
            let key = (tx.state_code.clone(), year);

            let totals = years.entry(key.clone()).or_default();
            totals.total += tx.amount;
            totals.exempt += tx.exempt_amount;
            totals.count += 1;
            match tx.channel {
                SalesChannel::Direct => totals.direct += tx.amount,
                SalesChannel::Marketplace => {
                    totals.marketplace += tx.amount;
                    totals.marketplace_taxable += tx.taxable_amount();
                    totals.marketplace_count += 1;
                }
            }

            let figures = figures_of(tx);
            *months
                .entry((tx.state_code.clone(), year, tx.date.month()))
                .or_default() += figures;
            *days.entry(key).or_default().entry(tx.date).or_default() += figures;
        }

        let summaries: Vec<StateYearSummary> = years
            .into_iter()
            .map(|((state_code, year), t)| StateYearSummary {
                state_code,
                year,
                total_sales: t.total,
                exempt_sales: t.exempt,
                taxable_sales: t.total - t.exempt,
                direct_sales: t.direct,
                marketplace_sales: t.marketplace,
                marketplace_taxable_sales: t.marketplace_taxable,
                transaction_count: t.count,
                marketplace_transaction_count: t.marketplace_count,
            })
            .collect();

        let monthly = months
            .into_iter()
            .map(|((state_code, year, month), figures)| StateMonthSummary {
                state_code,
                year,
                month,
                figures,
            })
            .collect();

        let cumulative = days
            .into_iter()
            .map(|(key, per_day)| {
                let mut running = SalesFigures::default();
                let series = per_day
                    .into_iter()
                    .map(|(date, figures)| {
                        running += figures;
                        CumulativePoint { date, running }
                    })
                    .collect();
                (key, series)
            })
            .collect();

        debug!(
            transactions = transactions.len(),
            state_years = summaries.len(),
            "aggregated sales"
        );

        Ok(AggregatedSales {
            summaries,
            cumulative,
            monthly,
        })
    }

    /// Windows of `window_months` consecutive months ending in each month of `year`.
    ///
    /// Months without sales count as zero. Returns twelve windows in
    /// chronological order of their end month.
    pub fn rolling_windows(
        monthly: &[StateMonthSummary],
        state_code: &str,
        year: i32,
        window_months: u32,
    ) -> Vec<RollingWindow> {
        let index = |y: i32, m: u32| i64::from(y) * 12 + i64::from(m) - 1;
        let span = i64::from(window_months.max(1));

        let state_months: Vec<(i64, SalesFigures)> = monthly
            .iter()
            .filter(|m| m.state_code == state_code)
            .map(|m| (index(m.year, m.month), m.figures))
            .collect();

        (1..=12)
            .map(|end_month| {
                let end = index(year, end_month);
                let start = end - span + 1;
                let figures = state_months
                    .iter()
                    .filter(|(i, _)| (start..=end).contains(i))
                    .fold(SalesFigures::default(), |acc, (_, f)| acc + *f);
                RollingWindow {
                    end_date: month_end(year, end_month),
                    figures,
                }
            })
            .collect()
    }
}
