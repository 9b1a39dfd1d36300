//! Interest accrued on unpaid base tax.
//!
//! | Method | Formula |
//! |--------|---------|
//! | simple | `B × a × d / 365` |
//! | compound monthly | `B × ((1 + m)^months − 1)` |
//! | compound daily | `B × ((1 + a/365)^d − 1)` |
//! | date-bounded periods | simple interest per overlapping sub-interval, summed |
//!
//! `B` is base tax, `a` the annual rate, `m` the monthly rate, `d` days
//! outstanding. Months are calendar months with a started month counted in full.

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{days_between, max, months_elapsed, round_half_up};
use crate::models::{InterestConfig, InterestMethod, InterestPeriod, InterestRate};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterestError {
    #[error("interest period list is empty")]
    EmptyPeriods,

    #[error("interest period starting {start} ends before it begins")]
    InvertedPeriod { start: NaiveDate },

    #[error("interest periods are not contiguous at {start}")]
    NotContiguous { start: NaiveDate },

    #[error("only the last interest period may be open-ended")]
    OpenEndedNotLast,

    #[error("compound interest overflowed over {periods} periods")]
    Overflow { periods: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestComputation {
    pub amount: Decimal,
    /// Annualised rate actually applied; day-weighted for period lists.
    pub effective_annual_rate: Decimal,
}

/// Applies one [`InterestConfig`] to a balance.
#[derive(Debug, Clone)]
pub struct InterestCalculator<'a> {
    config: &'a InterestConfig,
    days_per_year: Decimal,
}

impl<'a> InterestCalculator<'a> {
    pub fn new(
        config: &'a InterestConfig,
        days_per_year: i64,
    ) -> Self {
        Self {
            config,
            days_per_year: Decimal::from(days_per_year.max(1)),
        }
    }

    /// Interest on `base_tax` from `due_date` to `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`InterestError`] for a malformed period list or a compounding
    /// overflow.
    pub fn calculate(
        &self,
        base_tax: Decimal,
        due_date: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<InterestComputation, InterestError> {
        let days = days_between(due_date, as_of);

        let (raw, effective_annual_rate) = match &self.config.rate {
            InterestRate::Periods { periods } => {
                validate_periods(periods)?;
                self.periods_interest(base_tax, periods, due_date, as_of)
            }
            InterestRate::Annual { rate } => {
                let monthly = *rate / Decimal::from(12);
                let amount =
                    self.fixed_rate_interest(base_tax, *rate, monthly, days, due_date, as_of)?;
                (amount, *rate)
            }
            InterestRate::Monthly { rate } => {
                let annual = *rate * Decimal::from(12);
                let amount =
                    self.fixed_rate_interest(base_tax, annual, *rate, days, due_date, as_of)?;
                (amount, annual)
            }
        };

        let mut amount = round_half_up(raw.max(Decimal::ZERO));
        if amount > Decimal::ZERO {
            if let Some(minimum) = self.config.minimum_amount {
                amount = max(amount, minimum);
            }
        }

        Ok(InterestComputation {
            amount,
            effective_annual_rate,
        })
    }

    fn fixed_rate_interest(
        &self,
        base_tax: Decimal,
        annual: Decimal,
        monthly: Decimal,
        days: i64,
        due_date: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<Decimal, InterestError> {
        if days == 0 || base_tax <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        match self.config.method {
            InterestMethod::Simple => {
                Ok(base_tax * annual * Decimal::from(days) / self.days_per_year)
            }
            InterestMethod::CompoundMonthly => {
                let months = months_elapsed(due_date, as_of);
                compound(base_tax, monthly, months)
            }
            InterestMethod::CompoundDaily => {
                compound(base_tax, annual / self.days_per_year, days)
            }
        }
    }

    fn periods_interest(
        &self,
        base_tax: Decimal,
        periods: &[InterestPeriod],
        due_date: NaiveDate,
        as_of: NaiveDate,
    ) -> (Decimal, Decimal) {
        let total_days = days_between(due_date, as_of);
        if total_days == 0 {
            return (Decimal::ZERO, periods[0].annual_rate);
        }

        // Accrual runs over the days (due_date, as_of].
        let Some(first_day) = due_date.checked_add_days(Days::new(1)) else {
            return (Decimal::ZERO, periods[0].annual_rate);
        };

        let mut rate_days = Decimal::ZERO;
        for period in periods {
            let start = period.start.max(first_day);
            let end = period.end.map_or(as_of, |e| e.min(as_of));
            if end >= start {
                rate_days += period.annual_rate * Decimal::from((end - start).num_days() + 1);
            }
        }

        let first = &periods[0];
        let last = &periods[periods.len() - 1];
        let before = days_between(due_date, first.start.pred_opt().unwrap_or(first.start).min(as_of));
        let after = last.end.map_or(0, |end| days_between(end.max(due_date), as_of));
        if before + after > 0 {
            warn!(
                before,
                after, "interest days outside configured periods accrue at the nearest period rate"
            );
            rate_days += first.annual_rate * Decimal::from(before);
            rate_days += last.annual_rate * Decimal::from(after);
        }

        let amount = base_tax * rate_days / self.days_per_year;
        let effective = (rate_days / Decimal::from(total_days)).round_dp(6);
        (amount, effective)
    }
}

fn compound(
    base_tax: Decimal,
    rate: Decimal,
    periods: i64,
) -> Result<Decimal, InterestError> {
    let growth = (Decimal::ONE + rate)
        .checked_powi(periods)
        .ok_or(InterestError::Overflow { periods })?;
    Ok(base_tax * (growth - Decimal::ONE))
}

fn validate_periods(periods: &[InterestPeriod]) -> Result<(), InterestError> {
    if periods.is_empty() {
        return Err(InterestError::EmptyPeriods);
    }

    for (i, period) in periods.iter().enumerate() {
        let is_last = i + 1 == periods.len();
        match period.end {
            Some(end) if end < period.start => {
                return Err(InterestError::InvertedPeriod {
                    start: period.start,
                });
            }
            None if !is_last => return Err(InterestError::OpenEndedNotLast),
            _ => {}
        }

        if let Some(next) = periods.get(i + 1) {
            let contiguous = period
                .end
                .and_then(|end| end.succ_opt())
                .is_some_and(|day_after| day_after == next.start);
            if !contiguous {
                return Err(InterestError::NotContiguous { start: next.start });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(
        rate: InterestRate,
        method: InterestMethod,
    ) -> InterestConfig {
        InterestConfig {
            rate,
            method,
            minimum_amount: None,
        }
    }

    fn run(
        config: &InterestConfig,
        base: Decimal,
        due: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<InterestComputation, InterestError> {
        InterestCalculator::new(config, 365).calculate(base, due, as_of)
    }

    #[test]
    fn simple_annual_interest_for_one_year() {
        let cfg = config(InterestRate::Annual { rate: dec!(0.07) }, InterestMethod::Simple);

        let result = run(&cfg, dec!(1000), date(2023, 1, 1), date(2024, 1, 1)).unwrap();

        assert_eq!(result.amount, dec!(70.00));
        assert_eq!(result.effective_annual_rate, dec!(0.07));
    }

    #[test]
    fn simple_interest_is_prorated_by_day() {
        let cfg = config(InterestRate::Annual { rate: dec!(0.0730) }, InterestMethod::Simple);

        let result = run(&cfg, dec!(1000), date(2024, 1, 1), date(2024, 1, 11)).unwrap();

        // 1000 * 0.073 * 10 / 365 = 2.00
        assert_eq!(result.amount, dec!(2.00));
    }

    #[test]
    fn monthly_rate_is_annualised_for_simple_interest() {
        let cfg = config(InterestRate::Monthly { rate: dec!(0.01) }, InterestMethod::Simple);

        let result = run(&cfg, dec!(1000), date(2023, 1, 1), date(2024, 1, 1)).unwrap();

        assert_eq!(result.amount, dec!(120.00));
        assert_eq!(result.effective_annual_rate, dec!(0.12));
    }

    #[test]
    fn compound_monthly_interest() {
        let cfg = config(InterestRate::Monthly { rate: dec!(0.01) }, InterestMethod::CompoundMonthly);

        let result = run(&cfg, dec!(1000), date(2024, 1, 31), date(2024, 3, 31)).unwrap();

        // 1000 * (1.01^2 - 1) = 20.10
        assert_eq!(result.amount, dec!(20.10));
    }

    #[test]
    fn compound_monthly_counts_partial_month() {
        let cfg = config(InterestRate::Monthly { rate: dec!(0.01) }, InterestMethod::CompoundMonthly);

        let result = run(&cfg, dec!(1000), date(2024, 1, 31), date(2024, 2, 1)).unwrap();

        assert_eq!(result.amount, dec!(10.00));
    }

    #[test]
    fn compound_daily_exceeds_simple() {
        let daily = config(InterestRate::Annual { rate: dec!(0.0365) }, InterestMethod::CompoundDaily);
        let simple = config(InterestRate::Annual { rate: dec!(0.0365) }, InterestMethod::Simple);

        let d = run(&daily, dec!(100000), date(2023, 1, 1), date(2024, 1, 1)).unwrap();
        let s = run(&simple, dec!(100000), date(2023, 1, 1), date(2024, 1, 1)).unwrap();

        assert_eq!(s.amount, dec!(3650.00));
        // 100000 * (1.0001^365 - 1) = 3717.24
        assert_eq!(d.amount, dec!(3717.24));
    }

    #[test]
    fn zero_days_is_zero_interest() {
        let cfg = config(InterestRate::Annual { rate: dec!(0.07) }, InterestMethod::Simple);

        let result = run(&cfg, dec!(1000), date(2024, 6, 1), date(2024, 1, 1)).unwrap();

        assert_eq!(result.amount, Decimal::ZERO);
    }

    #[test]
    fn minimum_applies_only_to_positive_interest() {
        let mut cfg = config(InterestRate::Annual { rate: dec!(0.07) }, InterestMethod::Simple);
        cfg.minimum_amount = Some(dec!(25));

        let positive = run(&cfg, dec!(1000), date(2024, 1, 1), date(2024, 1, 11)).unwrap();
        let zero = run(&cfg, dec!(1000), date(2024, 1, 1), date(2024, 1, 1)).unwrap();

        assert_eq!(positive.amount, dec!(25));
        assert_eq!(zero.amount, Decimal::ZERO);
    }

    fn two_periods() -> InterestConfig {
        config(
            InterestRate::Periods {
                periods: vec![
                    InterestPeriod {
                        start: date(2023, 1, 1),
                        end: Some(date(2023, 12, 31)),
                        annual_rate: dec!(0.0365),
                    },
                    InterestPeriod {
                        start: date(2024, 1, 1),
                        end: None,
                        annual_rate: dec!(0.073),
                    },
                ],
            },
            InterestMethod::Simple,
        )
    }

    #[test]
    fn periods_sum_simple_interest_per_sub_interval() {
        // 2023-12-21 .. 2024-01-10: 10 days at 3.65%, 10 days at 7.3%.
        let result = run(&two_periods(), dec!(1000), date(2023, 12, 21), date(2024, 1, 10)).unwrap();

        // 1000 * (0.0365*10 + 0.073*10) / 365 = 1.00 + 2.00
        assert_eq!(result.amount, dec!(3.00));
        assert_eq!(result.effective_annual_rate, dec!(0.05475));
    }

    #[test]
    fn periods_days_before_first_period_use_first_rate() {
        let result = run(&two_periods(), dec!(1000), date(2022, 12, 21), date(2023, 1, 10)).unwrap();

        // 20 days at 3.65%
        assert_eq!(result.amount, dec!(2.00));
    }

    #[test]
    fn periods_with_gap_are_rejected() {
        let cfg = config(
            InterestRate::Periods {
                periods: vec![
                    InterestPeriod {
                        start: date(2023, 1, 1),
                        end: Some(date(2023, 6, 30)),
                        annual_rate: dec!(0.05),
                    },
                    InterestPeriod {
                        start: date(2023, 8, 1),
                        end: None,
                        annual_rate: dec!(0.06),
                    },
                ],
            },
            InterestMethod::Simple,
        );

        let result = run(&cfg, dec!(1000), date(2023, 1, 1), date(2024, 1, 1));

        assert_eq!(
            result,
            Err(InterestError::NotContiguous {
                start: date(2023, 8, 1)
            })
        );
    }

    #[test]
    fn open_ended_period_must_be_last() {
        let cfg = config(
            InterestRate::Periods {
                periods: vec![
                    InterestPeriod {
                        start: date(2023, 1, 1),
                        end: None,
                        annual_rate: dec!(0.05),
                    },
                    InterestPeriod {
                        start: date(2024, 1, 1),
                        end: None,
                        annual_rate: dec!(0.06),
                    },
                ],
            },
            InterestMethod::Simple,
        );

        assert_eq!(
            run(&cfg, dec!(1000), date(2023, 1, 1), date(2024, 6, 1)),
            Err(InterestError::OpenEndedNotLast)
        );
    }

    #[test]
    fn empty_periods_are_rejected() {
        let cfg = config(InterestRate::Periods { periods: vec![] }, InterestMethod::Simple);

        assert_eq!(
            run(&cfg, dec!(1000), date(2023, 1, 1), date(2024, 1, 1)),
            Err(InterestError::EmptyPeriods)
        );
    }
}
