use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed input rejected before it reaches the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid state code '{0}' (expected two uppercase letters)")]
    InvalidStateCode(String),

    #[error("{state_code}: {field} must be non-negative, got {value}")]
    NegativeAmount {
        state_code: String,
        field: &'static str,
        value: Decimal,
    },

    #[error("{state_code} {date}: exempt amount {exempt} exceeds sale amount {amount}")]
    ExemptExceedsAmount {
        state_code: String,
        date: NaiveDate,
        exempt: Decimal,
        amount: Decimal,
    },

    #[error("{state_code} {year}: direct ({direct}) + marketplace ({marketplace}) != total ({total})")]
    ChannelMismatch {
        state_code: String,
        year: i32,
        direct: Decimal,
        marketplace: Decimal,
        total: Decimal,
    },

    #[error("{state_code} {year}: taxable sales {taxable} != total {total} - exempt {exempt}")]
    TaxableMismatch {
        state_code: String,
        year: i32,
        taxable: Decimal,
        total: Decimal,
        exempt: Decimal,
    },

    #[error("{state_code} {year}: taxable marketplace sales {marketplace_taxable} exceed gross marketplace or taxable sales")]
    MarketplaceTaxableExceedsSales {
        state_code: String,
        year: i32,
        marketplace_taxable: Decimal,
    },

    #[error("{state_code} {year}: marketplace transaction count exceeds total count")]
    MarketplaceCountExceedsTotal { state_code: String, year: i32 },

    #[error("{state_code}: threshold rule effective {effective_from} has neither a revenue nor a transaction threshold")]
    MissingThreshold {
        state_code: String,
        effective_from: NaiveDate,
    },

    #[error("{state_code}: effective range ends ({effective_to}) before it starts ({effective_from})")]
    InvertedRange {
        state_code: String,
        effective_from: NaiveDate,
        effective_to: NaiveDate,
    },
}

/// Checks that a state code is two uppercase ASCII letters (`"CA"`, `"TX"`).
pub fn validate_state_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidStateCode(code.to_string()))
    }
}
