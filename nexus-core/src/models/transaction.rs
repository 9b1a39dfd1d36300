use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, validate_state_code};

/// How a sale reached the customer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SalesChannel {
    /// Sold and remitted by the seller itself.
    #[default]
    Direct,
    /// Sold through a marketplace facilitator that collects tax on the seller's behalf.
    Marketplace,
}

/// One validated sale, as produced by the upload/mapping layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub state_code: String,
    pub date: NaiveDate,
    /// Gross sale amount.
    pub amount: Decimal,
    /// Portion of `amount` that is exempt from tax.
    pub exempt_amount: Decimal,
    pub channel: SalesChannel,
}

impl Transaction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_state_code(&self.state_code)?;

        if self.amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                state_code: self.state_code.clone(),
                field: "amount",
                value: self.amount,
            });
        }
        if self.exempt_amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                state_code: self.state_code.clone(),
                field: "exempt_amount",
                value: self.exempt_amount,
            });
        }
        if self.exempt_amount > self.amount {
            return Err(ValidationError::ExemptExceedsAmount {
                state_code: self.state_code.clone(),
                date: self.date,
                exempt: self.exempt_amount,
                amount: self.amount,
            });
        }

        Ok(())
    }

    /// Taxable portion of the sale.
    pub fn taxable_amount(&self) -> Decimal {
        self.amount - self.exempt_amount
    }
}
