//! Liability calculation for one state-year with nexus.
//!
//! # Calculation steps
//!
//! | Step | Value |
//! |------|-------|
//! | 1 | Base tax: comparison sales × tax rate |
//! | 2 | Days outstanding: as-of date − due date, never negative |
//! | 3 | Interest via [`InterestCalculator`] |
//! | 4 | Penalties via [`PenaltyCalculator`] |
//! | 5 | Total liability: base tax + interest + penalties |
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use nexus_core::calculations::{LiabilityCalculator, LiabilityInputs};
//! use nexus_core::*;
//!
//! let nexus = NexusResult {
//!     status: NexusStatus::HasNexus,
//!     nexus_type: NexusType::Economic,
//!     first_crossed_date: None,
//!     threshold_percent: dec!(104),
//!     revenue_percent: Some(dec!(104)),
//!     transaction_percent: None,
//!     comparison_sales: dec!(520000),
//!     comparison_transactions: 150,
//!     threshold_met: true,
//!     carried_forward: false,
//!     marketplace_exclusion: false,
//! };
//! let rules = PenaltyInterestConfig {
//!     state_code: "CA".to_string(),
//!     effective_from: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
//!     effective_to: None,
//!     interest: InterestConfig {
//!         rate: InterestRate::Annual { rate: dec!(0.07) },
//!         method: InterestMethod::Simple,
//!         minimum_amount: None,
//!     },
//!     penalties: PenaltySet::default(),
//! };
//! let input = LiabilityInputs {
//!     state_code: "CA",
//!     nexus: &nexus,
//!     figures: SalesFigures { taxable_sales: dec!(10000), ..Default::default() },
//!     tax_rate: Some(dec!(0.10)),
//!     due_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
//!     as_of: NaiveDate::from_ymd_opt(2024, 12, 30).unwrap(),
//!     rules: &rules,
//! };
//!
//! let result = LiabilityCalculator::new(&EngineConfig::default()).calculate(&input).unwrap();
//!
//! assert_eq!(result.base_tax, dec!(1000.00));
//! assert_eq!(result.interest, dec!(70.00));
//! assert_eq!(result.total_liability, dec!(1070.00));
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{days_between, round_half_up};
use crate::calculations::interest::{InterestCalculator, InterestError};
use crate::calculations::penalty::{PenaltyCalculator, PenaltyError};
use crate::models::{
    EngineConfig, LiabilityResult, NexusResult, PenaltyInterestConfig, SalesFigures,
};

/// Errors fatal to a single state-year's liability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiabilityError {
    #[error(transparent)]
    UnknownPenaltyShape(#[from] PenaltyError),

    #[error("malformed interest configuration: {0}")]
    MalformedInterestConfig(#[from] InterestError),

    #[error("no tax rate supplied for {0}")]
    MissingTaxRate(String),
}

#[derive(Debug, Clone)]
pub struct LiabilityInputs<'a> {
    pub state_code: &'a str,
    pub nexus: &'a NexusResult,
    /// The year's own figures (not the lookback figures).
    pub figures: SalesFigures,
    pub tax_rate: Option<Decimal>,
    pub due_date: NaiveDate,
    pub as_of: NaiveDate,
    pub rules: &'a PenaltyInterestConfig,
}

#[derive(Debug, Clone)]
pub struct LiabilityCalculator<'a> {
    config: &'a EngineConfig,
}

impl<'a> LiabilityCalculator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Computes the liability breakdown.
    ///
    /// States without nexus (including approaching ones) get a zero result.
    ///
    /// # Errors
    ///
    /// Returns [`LiabilityError`] when the tax rate is missing or the
    /// penalty/interest rules cannot be evaluated.
    pub fn calculate(
        &self,
        input: &LiabilityInputs<'_>,
    ) -> Result<LiabilityResult, LiabilityError> {
        if !input.nexus.has_nexus() {
            return Ok(LiabilityResult::zero(input.due_date));
        }

        let tax_rate = input
            .tax_rate
            .ok_or_else(|| LiabilityError::MissingTaxRate(input.state_code.to_string()))?;

        let taxable_base = input
            .figures
            .comparison_sales(input.nexus.marketplace_exclusion);
        let base_tax = round_half_up(taxable_base * tax_rate);

        let days_outstanding = days_between(input.due_date, input.as_of);
        let years_outstanding = (Decimal::from(days_outstanding)
            / Decimal::from(self.config.days_per_year.max(1)))
        .round_dp(4);

        let interest = InterestCalculator::new(&input.rules.interest, self.config.days_per_year)
            .calculate(base_tax, input.due_date, input.as_of)?;

        let penalties =
            PenaltyCalculator::new(&input.rules.penalties).calculate(base_tax, days_outstanding)?;

        let total_liability = base_tax + interest.amount + penalties.total;

        debug!(
            state = input.state_code,
            %base_tax,
            interest = %interest.amount,
            penalties = %penalties.total,
            days_outstanding,
            "calculated liability"
        );

        Ok(LiabilityResult {
            taxable_base,
            tax_rate,
            base_tax,
            interest: interest.amount,
            effective_interest_rate: interest.effective_annual_rate,
            penalties,
            total_liability,
            due_date: input.due_date,
            days_outstanding,
            years_outstanding,
            registered: false,
        })
    }
}
