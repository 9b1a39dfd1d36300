use std::io::Read;

use chrono::NaiveDate;
use nexus_core::{SalesChannel, Transaction, ValidationError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading transaction data.
#[derive(Debug, Error)]
pub enum TransactionLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Row {row}: unknown sales channel '{value}' (expected direct or marketplace)")]
    InvalidChannel { row: usize, value: String },

    #[error("Row {row}: {source}")]
    Validation {
        row: usize,
        #[source]
        source: ValidationError,
    },
}

impl From<csv::Error> for TransactionLoaderError {
    fn from(err: csv::Error) -> Self {
        TransactionLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the transactions CSV file.
///
/// - `state`: two-letter state code
/// - `date`: sale date, `YYYY-MM-DD`
/// - `amount`: gross sale amount
/// - `exempt_amount`: exempt portion of the sale (empty for none)
/// - `channel`: `direct` or `marketplace` (empty for direct)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub state: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub exempt_amount: Option<Decimal>,
    #[serde(default)]
    pub channel: Option<String>,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn parse_channel(
    row: usize,
    value: Option<&str>,
) -> Result<SalesChannel, TransactionLoaderError> {
    match value.map(str::trim) {
        None | Some("") => Ok(SalesChannel::Direct),
        Some(v) if v.eq_ignore_ascii_case("direct") => Ok(SalesChannel::Direct),
        Some(v) if v.eq_ignore_ascii_case("marketplace") => Ok(SalesChannel::Marketplace),
        Some(v) => Err(TransactionLoaderError::InvalidChannel {
            row,
            value: v.to_string(),
        }),
    }
}

impl TransactionRecord {
    /// Converts and validates the record. `row` is 1-based and only used
    /// in error messages.
    pub fn into_transaction(
        self,
        row: usize,
    ) -> Result<Transaction, TransactionLoaderError> {
        let channel = parse_channel(row, self.channel.as_deref())?;
        let transaction = Transaction {
            state_code: self.state.trim().to_ascii_uppercase(),
            date: self.date,
            amount: self.amount,
            exempt_amount: self.exempt_amount.unwrap_or(Decimal::ZERO),
            channel,
        };
        transaction
            .validate()
            .map_err(|source| TransactionLoaderError::Validation { row, source })?;
        Ok(transaction)
    }
}

/// Loader for sales transactions from CSV files.
pub struct TransactionLoader;

impl TransactionLoader {
    /// Parse and validate transactions from a CSV reader.
    ///
    /// The reader can be any type that implements `Read`, such as a file or
    /// a string slice. The whole batch is rejected on the first bad row.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<Transaction>, TransactionLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut transactions = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let record: TransactionRecord = result?;
            transactions.push(record.into_transaction(index + 1)?);
        }

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const TEST_CSV: &str = r#"state,date,amount,exempt_amount,channel
CA,2024-01-15,1200.00,200.00,direct
TX,2024-02-01,350.50,,marketplace
ny,2024-03-10,99.99,,
"#;

    #[test]
    fn test_parse_csv() {
        let transactions = TransactionLoader::parse(TEST_CSV.as_bytes()).unwrap();

        assert_eq!(transactions.len(), 3);

        assert_eq!(transactions[0].state_code, "CA");
        assert_eq!(transactions[0].amount, dec!(1200.00));
        assert_eq!(transactions[0].exempt_amount, dec!(200.00));
        assert_eq!(transactions[0].channel, SalesChannel::Direct);

        assert_eq!(transactions[1].exempt_amount, Decimal::ZERO);
        assert_eq!(transactions[1].channel, SalesChannel::Marketplace);

        assert_eq!(transactions[2].state_code, "NY");
        assert_eq!(transactions[2].channel, SalesChannel::Direct);
    }

    #[test]
    fn test_parse_empty_csv() {
        let csv = "state,date,amount,exempt_amount,channel\n";
        let transactions = TransactionLoader::parse(csv.as_bytes()).unwrap();
        assert!(transactions.is_empty());
    }

    #[test]
    fn test_parse_invalid_date() {
        let csv = "state,date,amount,exempt_amount,channel\nCA,01/15/2024,100,,\n";
        let result = TransactionLoader::parse(csv.as_bytes());
        assert!(matches!(result, Err(TransactionLoaderError::CsvParse(_))));
    }

    #[test]
    fn test_parse_unknown_channel() {
        let csv = "state,date,amount,exempt_amount,channel\nCA,2024-01-15,100,,wholesale\n";
        let result = TransactionLoader::parse(csv.as_bytes());
        assert!(matches!(
            result,
            Err(TransactionLoaderError::InvalidChannel { row: 1, .. })
        ));
    }

    #[test]
    fn test_exempt_exceeding_amount_is_rejected() {
        let csv = "state,date,amount,exempt_amount,channel\n\
                   CA,2024-01-15,100,,\n\
                   CA,2024-01-16,100,150,direct\n";
        let result = TransactionLoader::parse(csv.as_bytes());
        assert!(matches!(
            result,
            Err(TransactionLoaderError::Validation {
                row: 2,
                source: ValidationError::ExemptExceedsAmount { .. }
            })
        ));
    }

    #[test]
    fn test_invalid_state_code_is_rejected() {
        let csv = "state,date,amount,exempt_amount,channel\nCAL,2024-01-15,100,,\n";
        let result = TransactionLoader::parse(csv.as_bytes());
        assert!(matches!(
            result,
            Err(TransactionLoaderError::Validation {
                source: ValidationError::InvalidStateCode(_),
                ..
            })
        ));
    }
}
