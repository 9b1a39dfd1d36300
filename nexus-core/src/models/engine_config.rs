use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tunable engine parameters.
///
/// Missing keys fall back to [`EngineConfig::default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Percent of a threshold (0-100) at which a state is reported as approaching.
    pub approaching_percent: Decimal,
    /// Day-count basis for annual rates.
    pub days_per_year: i64,
    /// Length of a rolling lookback window, in months.
    pub rolling_window_months: u32,
    /// Evaluate states on the rayon pool.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approaching_percent: Decimal::from(80),
            days_per_year: 365,
            rolling_window_months: 12,
            parallel: true,
        }
    }
}
