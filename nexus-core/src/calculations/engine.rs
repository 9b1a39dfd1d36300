//! Engine entry point.
//!
//! [`NexusEngine::evaluate`] resolves rules once, runs every state through a
//! [`StateOrchestrator`] and hands the outcomes to the [`ResultAssembler`].
//! States are independent, so they fan out on the rayon pool when
//! [`EngineConfig::parallel`] is set; the result is identical either way.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use nexus_core::calculations::{AnalysisInput, NexusEngine};
//! use nexus_core::EngineConfig;
//!
//! let input = AnalysisInput {
//!     as_of_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!     ..AnalysisInput::default()
//! };
//! let result = NexusEngine::new(EngineConfig::default()).evaluate(&input);
//! assert_eq!(result.summary.states_analyzed, 0);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::aggregator::{AggregatedSales, StateYear};
use crate::calculations::assembler::ResultAssembler;
use crate::calculations::orchestrator::StateOrchestrator;
use crate::calculations::resolver::RuleSet;
use crate::models::{
    AnalysisResult, CumulativePoint, EngineConfig, PenaltyInterestConfig, StateAnalysis,
    StateMonthSummary, StateYearSummary, ThresholdRule, ValidationError,
};

/// Everything one analysis run needs, already validated and resolved.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub summaries: Vec<StateYearSummary>,
    pub cumulative: BTreeMap<StateYear, Vec<CumulativePoint>>,
    pub monthly: Vec<StateMonthSummary>,
    pub threshold_rules: Vec<ThresholdRule>,
    pub penalty_interest_configs: Vec<PenaltyInterestConfig>,
    pub tax_rates: HashMap<String, Decimal>,
    pub physical_presence: HashSet<StateYear>,
    pub registration_dates: HashMap<String, NaiveDate>,
    pub deregistration_dates: HashMap<String, NaiveDate>,
    pub as_of_date: NaiveDate,
}

impl AnalysisInput {
    /// Starts an input from aggregator output; the remaining fields are
    /// filled in by the caller.
    pub fn from_aggregated(
        sales: AggregatedSales,
        threshold_rules: Vec<ThresholdRule>,
        penalty_interest_configs: Vec<PenaltyInterestConfig>,
        as_of_date: NaiveDate,
    ) -> Self {
        Self {
            summaries: sales.summaries,
            cumulative: sales.cumulative,
            monthly: sales.monthly,
            threshold_rules,
            penalty_interest_configs,
            as_of_date,
            ..Self::default()
        }
    }

    /// Checks caller-supplied summaries and rules before evaluation.
    ///
    /// # Errors
    ///
    /// Returns the first summary or threshold rule that breaks its invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for summary in &self.summaries {
            summary.validate()?;
        }
        for rule in &self.threshold_rules {
            rule.validate()?;
        }
        Ok(())
    }

    /// State codes with at least one summary, ascending.
    pub fn states(&self) -> BTreeSet<&str> {
        self.summaries.iter().map(|s| s.state_code.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NexusEngine {
    config: EngineConfig,
}

impl NexusEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        input: &AnalysisInput,
    ) -> AnalysisResult {
        let rules = RuleSet::new(&input.threshold_rules, &input.penalty_interest_configs);
        let states: Vec<&str> = input.states().into_iter().collect();
        debug!(
            states = states.len(),
            parallel = self.config.parallel,
            as_of = %input.as_of_date,
            "evaluating nexus"
        );

        let run = |state: &&str| -> (String, StateAnalysis) {
            let analysis = StateOrchestrator::new(state, input, &rules, &self.config).run();
            (state.to_string(), analysis)
        };

        let outcomes: Vec<(String, StateAnalysis)> = if self.config.parallel {
            states.par_iter().map(run).collect()
        } else {
            states.iter().map(run).collect()
        };

        ResultAssembler::assemble(input.as_of_date, outcomes)
    }
}
