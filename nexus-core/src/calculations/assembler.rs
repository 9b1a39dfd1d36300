//! Folds per-state outcomes into the engine's result document.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{AnalysisResult, AnalysisSummary, NexusStatus, StateAnalysis};

pub struct ResultAssembler;

impl ResultAssembler {
    /// Builds the result, keyed by state code, with portfolio totals.
    ///
    /// A state counts as approaching only when no year has nexus and at
    /// least one year is approaching. Totals skip year results that carry
    /// an error instead of a liability.
    pub fn assemble(
        as_of_date: NaiveDate,
        states: impl IntoIterator<Item = (String, StateAnalysis)>,
    ) -> AnalysisResult {
        let per_state: BTreeMap<String, StateAnalysis> = states.into_iter().collect();
        let summary = Self::summarize(&per_state);

        AnalysisResult {
            as_of_date,
            per_state,
            summary,
        }
    }

    fn summarize(per_state: &BTreeMap<String, StateAnalysis>) -> AnalysisSummary {
        per_state.values().fold(
            AnalysisSummary {
                states_analyzed: per_state.len(),
                ..AnalysisSummary::default()
            },
            |mut summary, state| {
                if state.has_nexus() {
                    summary.states_with_nexus += 1;
                } else if state
                    .years
                    .iter()
                    .any(|y| y.nexus.status == NexusStatus::Approaching)
                {
                    summary.states_approaching += 1;
                }
                if state.is_flagged() {
                    summary.states_flagged += 1;
                }

                for liability in state.years.iter().filter_map(|y| y.liability.as_ref()) {
                    summary.total_base_tax += liability.base_tax;
                    summary.total_interest += liability.interest;
                    summary.total_penalties += liability.penalties.total;
                    summary.total_liability += liability.total_liability;
                }
                summary
            },
        )
    }
}
