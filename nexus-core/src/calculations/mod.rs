//! Nexus determination and liability calculations.
//!
//! Stages run in this order for every state:
//! [`aggregator`] → [`resolver`] → [`nexus`] → [`liability`] (with
//! [`interest`] and [`penalty`]) → [`orchestrator`] → [`assembler`].
//! [`engine`] wires them together.

pub mod aggregator;
pub mod assembler;
pub mod common;
pub mod engine;
pub mod interest;
pub mod liability;
pub mod nexus;
pub mod orchestrator;
pub mod penalty;
pub mod resolver;

pub use aggregator::{AggregatedSales, RollingWindow, SalesAggregator, StateYear};
pub use assembler::ResultAssembler;
pub use engine::{AnalysisInput, NexusEngine};
pub use interest::{InterestCalculator, InterestComputation, InterestError};
pub use liability::{LiabilityCalculator, LiabilityError, LiabilityInputs};
pub use nexus::{NexusEvaluator, NexusInputs};
pub use orchestrator::{EstablishedNexus, NexusCarry, StateOrchestrator};
pub use penalty::{PenaltyCalculator, PenaltyError, evaluate_rule};
pub use resolver::{RuleResolverError, RuleSet, Versioned, VersionedRules};
