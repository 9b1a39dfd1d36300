//! Chronological, per-state processing across the analysis window.
//!
//! Years run in ascending order and thread a [`NexusCarry`] accumulator
//! through [`StateOrchestrator::step`]:
//!
//! - once a year has nexus, later years are forced to `HasNexus` until a
//!   deregistration date ends the carry;
//! - years starting on or after the registration date accrue no liability,
//!   and the year containing it is taxed on sales before that date;
//! - a resolver failure stops the state, a liability failure marks only its year.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::calculations::aggregator::SalesAggregator;
use crate::calculations::common::{year_end, year_start};
use crate::calculations::engine::AnalysisInput;
use crate::calculations::liability::{LiabilityCalculator, LiabilityError, LiabilityInputs};
use crate::calculations::nexus::{NexusEvaluator, NexusInputs};
use crate::calculations::resolver::{RuleResolverError, RuleSet};
use crate::models::{
    EngineConfig, ErrorKind, ErrorMarker, LiabilityResult, LookbackPeriod, NexusResult,
    NexusStatus, NexusType, SalesFigures, StateAnalysis, YearResult,
};

impl From<&RuleResolverError> for ErrorMarker {
    fn from(err: &RuleResolverError) -> Self {
        let kind = match err {
            RuleResolverError::ConfigNotFound { .. } => ErrorKind::ConfigNotFound,
            RuleResolverError::ConfigConflict { .. } => ErrorKind::ConfigConflict,
        };
        ErrorMarker {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<&LiabilityError> for ErrorMarker {
    fn from(err: &LiabilityError) -> Self {
        let kind = match err {
            LiabilityError::UnknownPenaltyShape(_) => ErrorKind::UnknownPenaltyShape,
            LiabilityError::MalformedInterestConfig(_) => ErrorKind::MalformedInterestConfig,
            LiabilityError::MissingTaxRate(_) => ErrorKind::MissingTaxRate,
        };
        ErrorMarker {
            kind,
            message: err.to_string(),
        }
    }
}

/// Nexus established in an earlier year of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstablishedNexus {
    pub since: NaiveDate,
    pub nexus_type: NexusType,
}

/// State carried from one year to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NexusCarry {
    pub established: Option<EstablishedNexus>,
    pub marketplace_exclusion: Option<bool>,
}

/// Runs one state through every year of its window.
pub struct StateOrchestrator<'a> {
    state_code: &'a str,
    input: &'a AnalysisInput,
    rules: &'a RuleSet,
    config: &'a EngineConfig,
}

impl<'a> StateOrchestrator<'a> {
    pub fn new(
        state_code: &'a str,
        input: &'a AnalysisInput,
        rules: &'a RuleSet,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            state_code,
            input,
            rules,
            config,
        }
    }

    /// First through last year with sales for this state, gaps included.
    fn window(&self) -> Option<(i32, i32)> {
        let years = self
            .input
            .summaries
            .iter()
            .filter(|s| s.state_code == self.state_code)
            .map(|s| s.year);
        let (min, max) = years.fold(None, |acc: Option<(i32, i32)>, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })?;
        Some((min, max))
    }

    pub fn run(&self) -> StateAnalysis {
        let mut analysis = StateAnalysis::default();
        let Some((first, last)) = self.window() else {
            return analysis;
        };

        let mut carry = NexusCarry::default();
        for year in first..=last {
            match self.step(carry, year) {
                Ok((next, result)) => {
                    carry = next;
                    analysis.years.push(result);
                }
                Err(err) => {
                    warn!(state = self.state_code, year, error = %err, "state flagged for review");
                    analysis.error = Some(ErrorMarker::from(&err));
                    break;
                }
            }
        }

        analysis
    }

    fn figures(
        &self,
        year: i32,
    ) -> Option<SalesFigures> {
        self.input
            .summaries
            .iter()
            .find(|s| s.state_code == self.state_code && s.year == year)
            .map(|s| s.figures())
    }

    /// Running figures for the year's sales dated strictly before `date`.
    fn sales_before(
        &self,
        year: i32,
        date: NaiveDate,
    ) -> SalesFigures {
        self.input
            .cumulative
            .get(&(self.state_code.to_string(), year))
            .and_then(|series| series.iter().take_while(|p| p.date < date).last())
            .map(|p| p.running)
            .unwrap_or_default()
    }

    /// One fold step: `(carry, year) -> (carry', result)`.
    pub fn step(
        &self,
        carry: NexusCarry,
        year: i32,
    ) -> Result<(NexusCarry, YearResult), RuleResolverError> {
        let as_of = self.input.as_of_date;
        let rule_date = year_end(year).min(as_of).max(year_start(year));
        let rule = self.rules.resolve_threshold(self.state_code, rule_date)?;

        let mut carry = carry;
        if let (Some(established), Some(deregistered)) = (
            carry.established,
            self.input.deregistration_dates.get(self.state_code),
        ) {
            if established.since <= *deregistered && *deregistered < year_start(year) {
                debug!(state = self.state_code, year, %deregistered, "nexus carry ended by deregistration");
                carry.established = None;
            }
        }
        let exclusion_changed = carry
            .marketplace_exclusion
            .is_some_and(|prev| prev != rule.marketplace_exclusion);
        if exclusion_changed {
            debug!(
                state = self.state_code,
                year,
                marketplace_exclusion = rule.marketplace_exclusion,
                "marketplace exclusion changed"
            );
        }
        carry.marketplace_exclusion = Some(rule.marketplace_exclusion);

        let windows = match rule.lookback {
            LookbackPeriod::Rolling12Months => SalesAggregator::rolling_windows(
                &self.input.monthly,
                self.state_code,
                year,
                self.config.rolling_window_months,
            ),
            _ => Vec::new(),
        };
        let key = (self.state_code.to_string(), year);
        let current = self.figures(year).unwrap_or_default();
        let nexus_input = NexusInputs {
            year,
            current,
            previous: self.figures(year - 1),
            rolling_windows: &windows,
            cumulative: self.input.cumulative.get(&key).map(Vec::as_slice).unwrap_or(&[]),
            physical_presence: self.input.physical_presence.contains(&key),
        };

        let nexus = NexusEvaluator::new(rule, self.config).evaluate(&nexus_input);
        let nexus = apply_carry(nexus, &carry);

        if nexus.has_nexus() {
            let nexus_type = nexus.nexus_type;
            carry.established = Some(match carry.established {
                Some(existing) => EstablishedNexus {
                    since: existing.since,
                    nexus_type: NexusType::from_flags(
                        existing.nexus_type.is_economic() || nexus_type.is_economic(),
                        existing.nexus_type.is_physical() || nexus_type.is_physical(),
                    ),
                },
                None => EstablishedNexus {
                    since: nexus.first_crossed_date.unwrap_or(year_start(year)),
                    nexus_type,
                },
            });
        }

        let (liability, error) = self.liability(year, &nexus, current)?;

        Ok((
            carry,
            YearResult {
                year,
                nexus,
                liability,
                error,
                marketplace_exclusion_changed: exclusion_changed,
            },
        ))
    }

    fn liability(
        &self,
        year: i32,
        nexus: &NexusResult,
        figures: SalesFigures,
    ) -> Result<(Option<LiabilityResult>, Option<ErrorMarker>), RuleResolverError> {
        let registration = self.input.registration_dates.get(self.state_code).copied();
        let due_date = match registration {
            Some(date) if date >= year_start(year) && date <= year_end(year) => date,
            _ => year_end(year),
        };

        if !nexus.has_nexus() {
            return Ok((Some(LiabilityResult::zero(due_date)), None));
        }

        if registration.is_some_and(|date| date <= year_start(year)) {
            let mut result = LiabilityResult::zero(due_date);
            result.registered = true;
            return Ok((Some(result), None));
        }

        let figures = match registration {
            Some(date) if date == due_date => self.sales_before(year, date),
            _ => figures,
        };

        let rules = self
            .rules
            .resolve_penalty_interest(self.state_code, due_date)?;

        let input = LiabilityInputs {
            state_code: self.state_code,
            nexus,
            figures,
            tax_rate: self.input.tax_rates.get(self.state_code).copied(),
            due_date,
            as_of: self.input.as_of_date,
            rules,
        };

        match LiabilityCalculator::new(self.config).calculate(&input) {
            Ok(result) => Ok((Some(result), None)),
            Err(err) => {
                warn!(state = self.state_code, year, error = %err, "liability flagged for review");
                Ok((None, Some(ErrorMarker::from(&err))))
            }
        }
    }
}

/// Forces `HasNexus` on a year that follows an established nexus.
fn apply_carry(
    nexus: NexusResult,
    carry: &NexusCarry,
) -> NexusResult {
    let Some(established) = carry.established else {
        return nexus;
    };
    if nexus.has_nexus() {
        return nexus;
    }

    NexusResult {
        status: NexusStatus::HasNexus,
        nexus_type: NexusType::from_flags(
            established.nexus_type.is_economic(),
            established.nexus_type.is_physical(),
        ),
        first_crossed_date: Some(established.since),
        carried_forward: true,
        ..nexus
    }
}
