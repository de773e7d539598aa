use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::money::validate_amount;
use crate::core::{AppError, BillingMonth};

/// Payment lifecycle: `pending` until an admin decides, then terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Verified => write!(f, "verified"),
            PaymentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "verified" => Ok(PaymentStatus::Verified),
            "rejected" => Ok(PaymentStatus::Rejected),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// Admin verdict on a pending payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Verified,
    Rejected,
}

impl Decision {
    /// Accepts `verified` or `rejected`; anything else is `InvalidDecision`
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "verified" => Ok(Decision::Verified),
            "rejected" => Ok(Decision::Rejected),
            other => Err(AppError::InvalidDecision(format!(
                "'{}' is not one of verified, rejected",
                other
            ))),
        }
    }

    pub fn status(&self) -> PaymentStatus {
        match self {
            Decision::Verified => PaymentStatus::Verified,
            Decision::Rejected => PaymentStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Transfer,
    Cash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Transfer => write!(f, "transfer"),
            PaymentMethod::Cash => write!(f, "cash"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(PaymentMethod::Transfer),
            "cash" => Ok(PaymentMethod::Cash),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Attempt to pay one bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub bill_id: i64,
    pub payment_number: String,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    /// Admin account that decided the payment
    pub verified_by: Option<i64>,
    pub verification_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub bill_id: i64,
    pub payment_number: String,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Decision written onto a pending payment
#[derive(Debug, Clone)]
pub struct PaymentDecision {
    pub status: PaymentStatus,
    pub verified_by: i64,
    pub verification_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPaymentRequest {
    pub bill_id: i64,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SubmitPaymentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bill_id <= 0 {
            return Err(AppError::validation("Bill ID is required"));
        }
        // Zero passes here; it is only accepted against a zero-total bill
        validate_amount("Amount", self.amount).map_err(AppError::Validation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedPayment {
    pub id: i64,
    pub payment_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecidePaymentRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionOutcome {
    pub payment_id: i64,
    pub bill_id: i64,
    pub status: PaymentStatus,
    /// True when the bill was flipped to `paid`
    pub bill_paid: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default)]
    pub month: Option<BillingMonth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusTotals {
    pub count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusCount {
    pub count: i64,
}

/// Payment counts and sums per status, optionally for one local month
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentStatistics {
    pub verified: StatusTotals,
    pub pending: StatusTotals,
    pub rejected: StatusCount,
}
