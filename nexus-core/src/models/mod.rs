mod analysis_result;
mod engine_config;
mod interest_config;
mod liability_result;
mod nexus_result;
mod penalty_rule;
mod sales_summary;
mod threshold_rule;
mod transaction;
mod validation;

pub use analysis_result::{
    AnalysisResult, AnalysisSummary, ErrorKind, ErrorMarker, StateAnalysis, YearResult,
};
pub use engine_config::EngineConfig;
pub use interest_config::{InterestConfig, InterestMethod, InterestPeriod, InterestRate};
pub use liability_result::{LiabilityResult, PenaltyBreakdown};
pub use nexus_result::{NexusResult, NexusStatus, NexusType};
pub use penalty_rule::{
    BasePlusPerPeriodPenalty, CombinedCap, EscalatingMinimum, FlatFeePenalty, FlatRatePenalty,
    PenaltyInterestConfig, PenaltyKind, PenaltyRule, PenaltySet, PenaltyTier, PerDayPenalty,
    PerPeriodPenalty, TieredPenalty,
};
pub use sales_summary::{CumulativePoint, SalesFigures, StateMonthSummary, StateYearSummary};
pub use threshold_rule::{Combinator, LookbackPeriod, ThresholdRule};
pub use transaction::{SalesChannel, Transaction};
pub use validation::{ValidationError, validate_state_code};
