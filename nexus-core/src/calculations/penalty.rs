//! Penalty calculations for the six state penalty shapes.
//!
//! Each shape has its own evaluation function, selected by the
//! [`PenaltyRule`] variant:
//!
//! | Shape | Amount |
//! |-------|--------|
//! | flat rate | `B × min(rate [+ additional], max_rate)`, then the minimum is added, or taken as the larger figure with `greater_of` |
//! | flat fee | fixed amount |
//! | per period | `B × min(rate × ⌈d / period⌉, max_rate)`, floored at the minimum, plus any flat fee |
//! | per day | `B × min(rate × d, max_rate)` |
//! | tiered | `B × rate` of the single tier containing `d` |
//! | base plus per period | `B × min(base + rate × ⌈d / period⌉, max_rate)`, floored at the escalating minimum in force |
//!
//! All amounts are zero when nothing is outstanding (`d = 0`).

use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::{max, periods_elapsed, round_half_up};
use crate::models::{
    BasePlusPerPeriodPenalty, FlatRatePenalty, PenaltyBreakdown, PenaltyKind, PenaltyRule,
    PenaltySet, PerDayPenalty, PerPeriodPenalty, TieredPenalty,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PenaltyError {
    /// The rule's shape is unrecognized or its parameters are unusable.
    #[error("unusable {shape} penalty for {kind}: {reason}")]
    UnknownPenaltyShape {
        kind: &'static str,
        shape: &'static str,
        reason: String,
    },
}

type ShapeResult = Result<Decimal, String>;

fn flat_rate(
    rule: &FlatRatePenalty,
    base_tax: Decimal,
    days: i64,
) -> ShapeResult {
    let mut rate = rule.rate;
    match (rule.additional_rate, rule.additional_after_days) {
        (Some(extra), Some(after)) if days > after => rate += extra,
        (Some(_), None) => return Err("additional_rate without additional_after_days".into()),
        _ => {}
    }
    if let Some(cap) = rule.max_rate {
        rate = rate.min(cap);
    }
    if days <= 0 {
        return Ok(Decimal::ZERO);
    }

    let rate_amount = base_tax * rate;
    Ok(match rule.minimum_amount {
        Some(minimum) if rule.greater_of => max(rate_amount, minimum),
        Some(minimum) => rate_amount + minimum,
        None => rate_amount,
    })
}

fn per_period(
    rule: &PerPeriodPenalty,
    base_tax: Decimal,
    days: i64,
) -> ShapeResult {
    if rule.period_days <= 0 {
        return Err(format!("period_days must be positive, got {}", rule.period_days));
    }
    if days <= 0 {
        return Ok(Decimal::ZERO);
    }

    let periods = periods_elapsed(days, rule.period_days);
    let rate = (rule.rate_per_period * Decimal::from(periods)).min(rule.max_rate);
    let mut amount = base_tax * rate;
    if let Some(minimum) = rule.minimum_amount {
        amount = max(amount, minimum);
    }
    Ok(amount + rule.flat_fee.unwrap_or(Decimal::ZERO))
}

fn per_day(
    rule: &PerDayPenalty,
    base_tax: Decimal,
    days: i64,
) -> ShapeResult {
    if days <= 0 {
        return Ok(Decimal::ZERO);
    }
    let rate = (rule.rate_per_day * Decimal::from(days)).min(rule.max_rate);
    Ok(base_tax * rate)
}

fn validate_tiers(rule: &TieredPenalty) -> Result<(), String> {
    if rule.tiers.is_empty() {
        return Err("no tiers".into());
    }

    for (i, tier) in rule.tiers.iter().enumerate() {
        let is_last = i + 1 == rule.tiers.len();
        match tier.max_days {
            Some(end) if end < tier.min_days => {
                return Err(format!("tier starting at day {} ends before it starts", tier.min_days));
            }
            None if !is_last => return Err("only the last tier may be unbounded".into()),
            Some(_) if is_last => return Err("the last tier must be unbounded".into()),
            _ => {}
        }
        if let (Some(end), Some(next)) = (tier.max_days, rule.tiers.get(i + 1)) {
            if next.min_days <= end {
                return Err(format!("tiers overlap at day {}", next.min_days));
            }
            if next.rate < tier.rate {
                return Err(format!("tier rate decreases at day {}", next.min_days));
            }
        }
    }

    Ok(())
}

fn tiered(
    rule: &TieredPenalty,
    base_tax: Decimal,
    days: i64,
) -> ShapeResult {
    validate_tiers(rule)?;
    if days <= 0 {
        return Ok(Decimal::ZERO);
    }

    // Tiers are not cumulative: exactly one rate applies.
    let rate = rule
        .tiers
        .iter()
        .find(|t| days >= t.min_days && t.max_days.is_none_or(|end| days <= end))
        .map_or(Decimal::ZERO, |t| t.rate);
    Ok(base_tax * rate)
}

fn base_plus_per_period(
    rule: &BasePlusPerPeriodPenalty,
    base_tax: Decimal,
    days: i64,
) -> ShapeResult {
    if rule.period_days <= 0 {
        return Err(format!("period_days must be positive, got {}", rule.period_days));
    }
    if rule.minimums.windows(2).any(|w| w[1].after_days < w[0].after_days) {
        return Err("minimums must be ordered by after_days".into());
    }
    if days <= 0 {
        return Ok(Decimal::ZERO);
    }

    let periods = periods_elapsed(days, rule.period_days);
    let rate = (rule.base_rate + rule.rate_per_period * Decimal::from(periods)).min(rule.max_rate);
    let amount = base_tax * rate;

    let minimum = rule
        .minimums
        .iter()
        .rev()
        .find(|m| days >= m.after_days)
        .map_or(Decimal::ZERO, |m| m.amount);

    Ok(max(amount, minimum))
}

/// Evaluates a single rule.
///
/// # Errors
///
/// [`PenaltyError::UnknownPenaltyShape`] for an unrecognized discriminator
/// or parameters the shape cannot be evaluated with.
pub fn evaluate_rule(
    kind: PenaltyKind,
    rule: &PenaltyRule,
    base_tax: Decimal,
    days: i64,
) -> Result<Decimal, PenaltyError> {
    let result = match rule {
        PenaltyRule::FlatRate(r) => flat_rate(r, base_tax, days),
        PenaltyRule::FlatFee(r) => Ok(if days > 0 { r.amount } else { Decimal::ZERO }),
        PenaltyRule::PerPeriod(r) => per_period(r, base_tax, days),
        PenaltyRule::PerDay(r) => per_day(r, base_tax, days),
        PenaltyRule::Tiered(r) => tiered(r, base_tax, days),
        PenaltyRule::BasePlusPerPeriod(r) => base_plus_per_period(r, base_tax, days),
        PenaltyRule::Unknown => Err("unrecognized penalty type".into()),
    };

    result
        .map(round_half_up)
        .map_err(|reason| PenaltyError::UnknownPenaltyShape {
            kind: kind.as_str(),
            shape: rule.shape_name(),
            reason,
        })
}

/// Applies every rule of a [`PenaltySet`] and its combined cap.
#[derive(Debug, Clone)]
pub struct PenaltyCalculator<'a> {
    penalties: &'a PenaltySet,
}

impl<'a> PenaltyCalculator<'a> {
    pub fn new(penalties: &'a PenaltySet) -> Self {
        Self { penalties }
    }

    pub fn calculate(
        &self,
        base_tax: Decimal,
        days: i64,
    ) -> Result<PenaltyBreakdown, PenaltyError> {
        let mut breakdown = PenaltyBreakdown::default();

        for (kind, rule) in self.penalties.rules() {
            let amount = evaluate_rule(kind, rule, base_tax, days)?;
            breakdown.items.insert(kind, amount);
        }

        let gross: Decimal = breakdown.items.values().copied().sum();

        if let Some(cap) = &self.penalties.combined_cap {
            let capped: Decimal = breakdown
                .items
                .iter()
                .filter(|(kind, _)| cap.applies_to.contains(kind))
                .map(|(_, amount)| *amount)
                .sum();
            let limit = round_half_up(base_tax * cap.max_combined_rate);
            if capped > limit {
                breakdown.combined_cap_adjustment = limit - capped;
            }
        }

        breakdown.total = gross + breakdown.combined_cap_adjustment;
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{CombinedCap, EscalatingMinimum, FlatFeePenalty, PenaltyTier};

    fn flat(
        rate: Decimal,
        minimum: Option<Decimal>,
        greater_of: bool,
    ) -> FlatRatePenalty {
        FlatRatePenalty {
            rate,
            minimum_amount: minimum,
            greater_of,
            max_rate: None,
            additional_rate: None,
            additional_after_days: None,
        }
    }

    fn eval(
        rule: PenaltyRule,
        base: Decimal,
        days: i64,
    ) -> Result<Decimal, PenaltyError> {
        evaluate_rule(PenaltyKind::LatePayment, &rule, base, days)
    }

    fn standard_tiers() -> TieredPenalty {
        TieredPenalty {
            tiers: vec![
                PenaltyTier {
                    min_days: 1,
                    max_days: Some(30),
                    rate: dec!(0.09),
                },
                PenaltyTier {
                    min_days: 31,
                    max_days: Some(60),
                    rate: dec!(0.19),
                },
                PenaltyTier {
                    min_days: 61,
                    max_days: None,
                    rate: dec!(0.29),
                },
            ],
        }
    }

    // =========================================================================
    // flat rate
    // =========================================================================

    #[test]
    fn greater_of_takes_larger_not_sum() {
        let result = eval(PenaltyRule::FlatRate(flat(dec!(0.10), Some(dec!(50)), true)), dec!(1000), 30);

        assert_eq!(result, Ok(dec!(100.00)));
    }

    #[test]
    fn greater_of_uses_minimum_when_larger() {
        let result = eval(PenaltyRule::FlatRate(flat(dec!(0.10), Some(dec!(50)), true)), dec!(200), 30);

        assert_eq!(result, Ok(dec!(50.00)));
    }

    #[test]
    fn minimum_without_greater_of_is_added() {
        let result = eval(PenaltyRule::FlatRate(flat(dec!(0.10), Some(dec!(50)), false)), dec!(1000), 30);

        assert_eq!(result, Ok(dec!(150.00)));
    }

    #[test]
    fn greater_of_equals_one_of_its_inputs() {
        for base in [dec!(0), dec!(100), dec!(499.99), dec!(500), dec!(501), dec!(12345.67)] {
            let result = eval(PenaltyRule::FlatRate(flat(dec!(0.10), Some(dec!(50)), true)), base, 10).unwrap();
            let rate_amount = round_half_up(base * dec!(0.10));

            assert!(result >= rate_amount && result >= dec!(50));
            assert!(result == rate_amount || result == dec!(50));
        }
    }

    #[test]
    fn additional_rate_applies_after_days_and_is_capped() {
        let mut rule = flat(dec!(0.05), None, false);
        rule.additional_rate = Some(dec!(0.10));
        rule.additional_after_days = Some(30);
        rule.max_rate = Some(dec!(0.12));

        let early = eval(PenaltyRule::FlatRate(rule.clone()), dec!(1000), 30);
        let late = eval(PenaltyRule::FlatRate(rule), dec!(1000), 31);

        assert_eq!(early, Ok(dec!(50.00)));
        assert_eq!(late, Ok(dec!(120.00)));
    }

    #[test]
    fn additional_rate_without_trigger_is_malformed() {
        let mut rule = flat(dec!(0.05), None, false);
        rule.additional_rate = Some(dec!(0.10));

        let result = eval(PenaltyRule::FlatRate(rule), dec!(1000), 31);

        assert!(matches!(result, Err(PenaltyError::UnknownPenaltyShape { shape: "flat_rate", .. })));
    }

    #[test]
    fn zero_days_is_zero_penalty() {
        let result = eval(PenaltyRule::FlatRate(flat(dec!(0.10), Some(dec!(50)), true)), dec!(1000), 0);

        assert_eq!(result, Ok(Decimal::ZERO));
        assert_eq!(
            eval(PenaltyRule::FlatFee(FlatFeePenalty { amount: dec!(50) }), dec!(1000), 0),
            Ok(Decimal::ZERO)
        );
    }

    // =========================================================================
    // per period / per day
    // =========================================================================

    #[test]
    fn per_period_counts_started_periods_and_caps() {
        let rule = PerPeriodPenalty {
            rate_per_period: dec!(0.05),
            period_days: 30,
            max_rate: dec!(0.25),
            minimum_amount: None,
            flat_fee: None,
        };

        assert_eq!(eval(PenaltyRule::PerPeriod(rule.clone()), dec!(1000), 31), Ok(dec!(100.00)));
        assert_eq!(eval(PenaltyRule::PerPeriod(rule), dec!(1000), 400), Ok(dec!(250.00)));
    }

    #[test]
    fn per_period_applies_minimum_then_flat_fee() {
        let rule = PerPeriodPenalty {
            rate_per_period: dec!(0.05),
            period_days: 30,
            max_rate: dec!(0.25),
            minimum_amount: Some(dec!(15)),
            flat_fee: Some(dec!(10)),
        };

        assert_eq!(eval(PenaltyRule::PerPeriod(rule), dec!(100), 10), Ok(dec!(25.00)));
    }

    #[test]
    fn per_period_with_zero_length_is_malformed() {
        let rule = PerPeriodPenalty {
            rate_per_period: dec!(0.05),
            period_days: 0,
            max_rate: dec!(0.25),
            minimum_amount: None,
            flat_fee: None,
        };

        assert!(eval(PenaltyRule::PerPeriod(rule), dec!(100), 10).is_err());
    }

    #[test]
    fn per_day_is_capped() {
        let rule = PerDayPenalty {
            rate_per_day: dec!(0.001),
            max_rate: dec!(0.05),
        };

        assert_eq!(eval(PenaltyRule::PerDay(rule.clone()), dec!(1000), 20), Ok(dec!(20.00)));
        assert_eq!(eval(PenaltyRule::PerDay(rule), dec!(1000), 365), Ok(dec!(50.00)));
    }

    // =========================================================================
    // tiered
    // =========================================================================

    #[test]
    fn tiered_applies_only_containing_tier() {
        let result = eval(PenaltyRule::Tiered(standard_tiers()), dec!(1000), 45);

        assert_eq!(result, Ok(dec!(190.00)));
    }

    #[test]
    fn tiered_boundaries_are_inclusive() {
        let rule = PenaltyRule::Tiered(standard_tiers());

        assert_eq!(eval(rule.clone(), dec!(1000), 30), Ok(dec!(90.00)));
        assert_eq!(eval(rule.clone(), dec!(1000), 31), Ok(dec!(190.00)));
        assert_eq!(eval(rule, dec!(1000), 1000), Ok(dec!(290.00)));
    }

    #[test]
    fn tiered_never_decreases_with_days() {
        let rule = PenaltyRule::Tiered(standard_tiers());
        let mut previous = Decimal::ZERO;

        for days in 0..120 {
            let amount = eval(rule.clone(), dec!(1000), days).unwrap();
            assert!(amount >= previous, "day {days}");
            previous = amount;
        }
    }

    #[test]
    fn tiered_overlap_is_malformed() {
        let mut tiers = standard_tiers();
        tiers.tiers[1].min_days = 30;

        let result = eval(PenaltyRule::Tiered(tiers), dec!(1000), 45);

        assert!(matches!(
            result,
            Err(PenaltyError::UnknownPenaltyShape { shape: "tiered", .. })
        ));
    }

    #[test]
    fn tiered_bounded_last_tier_is_malformed() {
        let mut tiers = standard_tiers();
        tiers.tiers[2].max_days = Some(90);

        assert!(eval(PenaltyRule::Tiered(tiers), dec!(1000), 45).is_err());
    }

    // =========================================================================
    // base plus per period
    // =========================================================================

    fn base_plus() -> BasePlusPerPeriodPenalty {
        BasePlusPerPeriodPenalty {
            base_rate: dec!(0.05),
            rate_per_period: dec!(0.01),
            period_days: 30,
            max_rate: dec!(0.25),
            minimums: vec![
                EscalatingMinimum {
                    after_days: 1,
                    amount: dec!(50),
                },
                EscalatingMinimum {
                    after_days: 60,
                    amount: dec!(100),
                },
            ],
        }
    }

    #[test]
    fn base_plus_per_period_adds_period_rate() {
        // 65 days: 3 periods, 5% + 3% = 8%
        let result = eval(PenaltyRule::BasePlusPerPeriod(base_plus()), dec!(10000), 65);

        assert_eq!(result, Ok(dec!(800.00)));
    }

    #[test]
    fn base_plus_per_period_uses_escalating_minimum() {
        let rule = PenaltyRule::BasePlusPerPeriod(base_plus());

        assert_eq!(eval(rule.clone(), dec!(100), 10), Ok(dec!(50.00)));
        assert_eq!(eval(rule, dec!(100), 60), Ok(dec!(100.00)));
    }

    #[test]
    fn base_plus_per_period_is_capped() {
        let result = eval(PenaltyRule::BasePlusPerPeriod(base_plus()), dec!(10000), 3650);

        assert_eq!(result, Ok(dec!(2500.00)));
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let result = evaluate_rule(PenaltyKind::Fraud, &PenaltyRule::Unknown, dec!(100), 10);

        assert_eq!(
            result,
            Err(PenaltyError::UnknownPenaltyShape {
                kind: "fraud",
                shape: "unknown",
                reason: "unrecognized penalty type".to_string(),
            })
        );
    }

    // =========================================================================
    // penalty sets
    // =========================================================================

    #[test]
    fn set_sums_independent_kinds() {
        let set = PenaltySet {
            late_filing: Some(PenaltyRule::FlatRate(flat(dec!(0.05), None, false))),
            late_payment: Some(PenaltyRule::Tiered(standard_tiers())),
            negligence: Some(PenaltyRule::FlatFee(FlatFeePenalty { amount: dec!(25) })),
            ..PenaltySet::default()
        };

        let breakdown = PenaltyCalculator::new(&set).calculate(dec!(1000), 45).unwrap();

        assert_eq!(breakdown.items[&PenaltyKind::LateFiling], dec!(50.00));
        assert_eq!(breakdown.items[&PenaltyKind::LatePayment], dec!(190.00));
        assert_eq!(breakdown.items[&PenaltyKind::Negligence], dec!(25));
        assert_eq!(breakdown.combined_cap_adjustment, Decimal::ZERO);
        assert_eq!(breakdown.total, dec!(265.00));
    }

    #[test]
    fn combined_cap_clamps_only_listed_kinds() {
        let set = PenaltySet {
            late_filing: Some(PenaltyRule::FlatRate(flat(dec!(0.20), None, false))),
            late_payment: Some(PenaltyRule::FlatRate(flat(dec!(0.15), None, false))),
            fraud: Some(PenaltyRule::FlatFee(FlatFeePenalty { amount: dec!(100) })),
            combined_cap: Some(CombinedCap {
                max_combined_rate: dec!(0.25),
                applies_to: vec![PenaltyKind::LateFiling, PenaltyKind::LatePayment],
            }),
            ..PenaltySet::default()
        };

        let breakdown = PenaltyCalculator::new(&set).calculate(dec!(1000), 90).unwrap();

        // 200 + 150 capped to 250, plus the uncapped 100.
        assert_eq!(breakdown.combined_cap_adjustment, dec!(-100.00));
        assert_eq!(breakdown.total, dec!(350.00));
    }

    #[test]
    fn combined_cap_below_limit_changes_nothing() {
        let set = PenaltySet {
            late_filing: Some(PenaltyRule::FlatRate(flat(dec!(0.05), None, false))),
            combined_cap: Some(CombinedCap {
                max_combined_rate: dec!(0.25),
                applies_to: vec![PenaltyKind::LateFiling, PenaltyKind::LatePayment],
            }),
            ..PenaltySet::default()
        };

        let breakdown = PenaltyCalculator::new(&set).calculate(dec!(1000), 90).unwrap();

        assert_eq!(breakdown.total, dec!(50.00));
    }

    #[test]
    fn set_with_unknown_rule_fails() {
        let set = PenaltySet {
            late_filing: Some(PenaltyRule::FlatFee(FlatFeePenalty { amount: dec!(5) })),
            e_filing_failure: Some(PenaltyRule::Unknown),
            ..PenaltySet::default()
        };

        assert!(PenaltyCalculator::new(&set).calculate(dec!(1000), 10).is_err());
    }
}
