//! Common utility functions for nexus and liability calculations.
//!
//! This module provides shared functionality used across the evaluator and
//! the liability calculator, including rounding and day-count helpers.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use nexus_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the maximum of two decimal values.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use nexus_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(-200.00)), dec!(-100.00));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Number of started periods: `ceil(days / period_days)`.
///
/// Zero days is zero periods. `period_days` must be positive.
pub fn periods_elapsed(
    days: i64,
    period_days: i64,
) -> i64 {
    if days <= 0 {
        return 0;
    }
    (days + period_days - 1) / period_days
}

/// `value / threshold * 100`, or `None` when there is no usable threshold.
pub fn percent_of(
    value: Decimal,
    threshold: Decimal,
) -> Option<Decimal> {
    if threshold <= Decimal::ZERO {
        return None;
    }
    Some(round_half_up(value / threshold * Decimal::ONE_HUNDRED))
}

/// Whole days from `from` to `to`, clamped at zero.
pub fn days_between(
    from: NaiveDate,
    to: NaiveDate,
) -> i64 {
    (to - from).num_days().max(0)
}

pub fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Last calendar day of the given month.
pub fn month_end(
    year: i32,
    month: u32,
) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Calendar months from `from` to `to`, counting a started month as a full one.
pub fn months_elapsed(
    from: NaiveDate,
    to: NaiveDate,
) -> i64 {
    if to <= from {
        return 0;
    }
    let mut months =
        i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month());
    if to.day() < from.day() {
        months -= 1;
    }
    let anniversary = from
        .checked_add_months(chrono::Months::new(months.max(0) as u32))
        .unwrap_or(to);
    if anniversary < to {
        months += 1;
    }
    months.max(0)
}
