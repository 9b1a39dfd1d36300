use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use nexus_core::calculations::AnalysisInput;
use nexus_core::{ValidationError, validate_state_code};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid context: {0}")]
    Validation(#[from] ValidationError),

    #[error("{state_code}: tax rate {rate} is outside 0..=1")]
    InvalidTaxRate { state_code: String, rate: Decimal },
}

/// Per-client facts the engine cannot derive from sales.
///
/// ```json
/// {
///   "tax_rates": {"CA": "0.0725"},
///   "physical_presence": {"CA": [2022, 2023]},
///   "registration_dates": {"CA": "2024-03-01"},
///   "deregistration_dates": {}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    #[serde(default)]
    pub tax_rates: BTreeMap<String, Decimal>,
    /// Years in which the business had physical presence, per state.
    #[serde(default)]
    pub physical_presence: BTreeMap<String, Vec<i32>>,
    #[serde(default)]
    pub registration_dates: BTreeMap<String, NaiveDate>,
    #[serde(default)]
    pub deregistration_dates: BTreeMap<String, NaiveDate>,
}

impl AnalysisContext {
    pub fn from_json<R: Read>(reader: R) -> Result<Self, ContextError> {
        let context: AnalysisContext = serde_json::from_reader(reader)?;
        context.validate()?;
        Ok(context)
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        for (state_code, rate) in &self.tax_rates {
            validate_state_code(state_code)?;
            if *rate < Decimal::ZERO || *rate > Decimal::ONE {
                return Err(ContextError::InvalidTaxRate {
                    state_code: state_code.clone(),
                    rate: *rate,
                });
            }
        }
        for state_code in self
            .physical_presence
            .keys()
            .chain(self.registration_dates.keys())
            .chain(self.deregistration_dates.keys())
        {
            validate_state_code(state_code)?;
        }
        Ok(())
    }

    /// Copies the context into an engine input, replacing whatever the
    /// input held for these fields.
    pub fn apply(
        self,
        input: &mut AnalysisInput,
    ) {
        input.tax_rates = self.tax_rates.into_iter().collect();
        input.physical_presence = self
            .physical_presence
            .into_iter()
            .flat_map(|(state, years)| years.into_iter().map(move |y| (state.clone(), y)))
            .collect();
        input.registration_dates = self.registration_dates.into_iter().collect();
        input.deregistration_dates = self.deregistration_dates.into_iter().collect();
    }
}
