//! Economic nexus evaluation for a single state and year.
//!
//! # Lookback periods
//!
//! | Lookback | Figures compared |
//! |----------|------------------|
//! | current calendar year | the evaluated year |
//! | current or previous calendar year | per-figure max of the evaluated and prior year |
//! | rolling 12 months | every pre-windowed summary ending in the evaluated year |
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use nexus_core::calculations::{NexusEvaluator, NexusInputs};
//! use nexus_core::{Combinator, EngineConfig, LookbackPeriod, NexusStatus, SalesFigures, ThresholdRule};
//!
//! let rule = ThresholdRule {
//!     state_code: "CA".to_string(),
//!     effective_from: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
//!     effective_to: None,
//!     lookback: LookbackPeriod::CurrentCalendarYear,
//!     revenue_threshold: Some(dec!(500000)),
//!     transaction_threshold: None,
//!     combinator: Combinator::Or,
//!     marketplace_exclusion: false,
//! };
//! let config = EngineConfig::default();
//! let figures = SalesFigures { taxable_sales: dec!(520000), transaction_count: 10, ..Default::default() };
//!
//! let result = NexusEvaluator::new(&rule, &config).evaluate(&NexusInputs::for_year(2024, figures));
//!
//! assert_eq!(result.status, NexusStatus::HasNexus);
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::aggregator::RollingWindow;
use crate::calculations::common::{percent_of, year_start};
use crate::models::{
    Combinator, CumulativePoint, EngineConfig, LookbackPeriod, NexusResult, NexusStatus,
    NexusType, SalesFigures, ThresholdRule,
};

/// Everything the evaluator needs to know about one state-year.
#[derive(Debug, Clone, Default)]
pub struct NexusInputs<'a> {
    pub year: i32,
    pub current: SalesFigures,
    /// Prior year's figures, for the current-or-previous lookback.
    pub previous: Option<SalesFigures>,
    /// Pre-windowed summaries, for the rolling lookback.
    pub rolling_windows: &'a [RollingWindow],
    /// Date-ordered running totals of the evaluated year.
    pub cumulative: &'a [CumulativePoint],
    pub physical_presence: bool,
}

impl NexusInputs<'_> {
    pub fn for_year(
        year: i32,
        current: SalesFigures,
    ) -> Self {
        Self {
            year,
            current,
            ..Self::default()
        }
    }
}

/// Outcome of comparing one set of figures against a rule's thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ThresholdTest {
    satisfied: bool,
    revenue_percent: Option<Decimal>,
    transaction_percent: Option<Decimal>,
    comparison_sales: Decimal,
    comparison_transactions: u64,
}

impl ThresholdTest {
    fn strength(&self) -> Decimal {
        self.revenue_percent
            .unwrap_or(Decimal::ZERO)
            .max(self.transaction_percent.unwrap_or(Decimal::ZERO))
    }
}

/// Applies one [`ThresholdRule`] to a state-year.
#[derive(Debug, Clone)]
pub struct NexusEvaluator<'a> {
    rule: &'a ThresholdRule,
    config: &'a EngineConfig,
}

impl<'a> NexusEvaluator<'a> {
    pub fn new(
        rule: &'a ThresholdRule,
        config: &'a EngineConfig,
    ) -> Self {
        Self { rule, config }
    }

    pub fn evaluate(
        &self,
        input: &NexusInputs<'_>,
    ) -> NexusResult {
        let (test, first_crossed_date) = match self.rule.lookback {
            LookbackPeriod::CurrentCalendarYear => self.evaluate_calendar(input, None),
            LookbackPeriod::CurrentOrPreviousCalendarYear => {
                self.evaluate_calendar(input, input.previous)
            }
            LookbackPeriod::Rolling12Months => self.evaluate_rolling(input),
        };

        let status = if test.satisfied || input.physical_presence {
            NexusStatus::HasNexus
        } else if test.strength() >= self.config.approaching_percent {
            NexusStatus::Approaching
        } else {
            NexusStatus::NoNexus
        };

        let threshold_percent = test
            .revenue_percent
            .or(test.transaction_percent)
            .unwrap_or(Decimal::ZERO);

        debug!(
            state = %self.rule.state_code,
            year = input.year,
            ?status,
            %threshold_percent,
            "evaluated nexus"
        );

        NexusResult {
            status,
            nexus_type: NexusType::from_flags(test.satisfied, input.physical_presence),
            first_crossed_date: if test.satisfied { first_crossed_date } else { None },
            threshold_percent,
            revenue_percent: test.revenue_percent,
            transaction_percent: test.transaction_percent,
            comparison_sales: test.comparison_sales,
            comparison_transactions: test.comparison_transactions,
            threshold_met: test.satisfied,
            carried_forward: false,
            marketplace_exclusion: self.rule.marketplace_exclusion,
        }
    }

    /// Calendar-year lookbacks, with an optional prior year folded in by max.
    fn evaluate_calendar(
        &self,
        input: &NexusInputs<'_>,
        previous: Option<SalesFigures>,
    ) -> (ThresholdTest, Option<NaiveDate>) {
        let floor = previous.unwrap_or_default();
        let test = self.test(&input.current.max_of(&floor));

        if !test.satisfied {
            return (test, None);
        }

        // Already over the line on prior-year figures alone.
        if previous.is_some() && self.test(&floor).satisfied {
            return (test, Some(year_start(input.year)));
        }

        let crossed = input
            .cumulative
            .iter()
            .find(|point| self.test(&point.running.max_of(&floor)).satisfied)
            .map(|point| point.date);

        (test, crossed)
    }

    fn evaluate_rolling(
        &self,
        input: &NexusInputs<'_>,
    ) -> (ThresholdTest, Option<NaiveDate>) {
        if input.rolling_windows.is_empty() {
            warn!(
                state = %self.rule.state_code,
                year = input.year,
                "no rolling windows supplied; falling back to calendar-year figures"
            );
            return self.evaluate_calendar(input, None);
        }

        let tests: Vec<(ThresholdTest, NaiveDate)> = input
            .rolling_windows
            .iter()
            .map(|w| (self.test(&w.figures), w.end_date))
            .collect();

        let first_crossed = tests
            .iter()
            .find(|(t, _)| t.satisfied)
            .map(|(_, end_date)| *end_date);

        // Earliest window wins ties.
        let mut strongest = &tests[0].0;
        for (t, _) in &tests[1..] {
            if (t.satisfied, t.strength()) > (strongest.satisfied, strongest.strength()) {
                strongest = t;
            }
        }

        (strongest.clone(), first_crossed)
    }

    fn test(
        &self,
        figures: &SalesFigures,
    ) -> ThresholdTest {
        let exclude = self.rule.marketplace_exclusion;
        let sales = figures.comparison_sales(exclude);
        let transactions = figures.comparison_transactions(exclude);

        let revenue_met = self.rule.revenue_threshold.map(|t| sales >= t);
        let transactions_met = self.rule.transaction_threshold.map(|t| transactions >= t);

        let applicable: Vec<bool> = [revenue_met, transactions_met].into_iter().flatten().collect();
        let satisfied = match self.rule.combinator {
            Combinator::And => !applicable.is_empty() && applicable.iter().all(|met| *met),
            Combinator::Or => applicable.iter().any(|met| *met),
        };

        ThresholdTest {
            satisfied,
            revenue_percent: self
                .rule
                .revenue_threshold
                .and_then(|t| percent_of(sales, t)),
            transaction_percent: self
                .rule
                .transaction_threshold
                .and_then(|t| percent_of(Decimal::from(transactions), Decimal::from(t))),
            comparison_sales: sales,
            comparison_transactions: transactions,
        }
    }
}
