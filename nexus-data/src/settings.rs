use std::fs;
use std::path::Path;

use nexus_core::EngineConfig;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Cannot read settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Parses engine settings from TOML. Missing keys keep their defaults.
///
/// ```toml
/// approaching_percent = "75"
/// days_per_year = 365
/// rolling_window_months = 12
/// parallel = false
/// ```
pub fn parse_settings(text: &str) -> Result<EngineConfig, SettingsError> {
    let config: EngineConfig = toml::from_str(text)?;

    if config.approaching_percent <= Decimal::ZERO || config.approaching_percent > Decimal::ONE_HUNDRED {
        return Err(SettingsError::Invalid(format!(
            "approaching_percent must be in (0, 100], got {}",
            config.approaching_percent
        )));
    }
    if config.days_per_year <= 0 {
        return Err(SettingsError::Invalid(format!(
            "days_per_year must be positive, got {}",
            config.days_per_year
        )));
    }
    if config.rolling_window_months == 0 {
        return Err(SettingsError::Invalid(
            "rolling_window_months must be at least 1".to_string(),
        ));
    }

    Ok(config)
}

pub fn load_settings(path: &Path) -> Result<EngineConfig, SettingsError> {
    let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_settings(&text)
}
