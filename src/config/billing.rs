use super::env_or;
use crate::core::{AppError, Result};

/// Knobs of bill generation and payment submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    /// Days between generation and due date
    pub due_days: u32,
    pub bill_number_prefix: String,
    pub payment_number_prefix: String,
    /// Candidates tried before a number collision is reported as a conflict
    pub number_generation_attempts: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            due_days: 20,
            bill_number_prefix: "INV".to_string(),
            payment_number_prefix: "PAY".to_string(),
            number_generation_attempts: 5,
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            due_days: env_or("BILL_DUE_DAYS", defaults.due_days)?,
            bill_number_prefix: env_or("BILL_NUMBER_PREFIX", defaults.bill_number_prefix)?,
            payment_number_prefix: env_or("PAYMENT_NUMBER_PREFIX", defaults.payment_number_prefix)?,
            number_generation_attempts: env_or(
                "NUMBER_GENERATION_ATTEMPTS",
                defaults.number_generation_attempts,
            )?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.due_days == 0 {
            return Err(AppError::Configuration(
                "BILL_DUE_DAYS must be greater than 0".to_string(),
            ));
        }

        if self.number_generation_attempts == 0 {
            return Err(AppError::Configuration(
                "NUMBER_GENERATION_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        if self.bill_number_prefix.trim().is_empty() || self.payment_number_prefix.trim().is_empty() {
            return Err(AppError::Configuration(
                "Bill and payment number prefixes cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
