use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Broad failure class, used for HTTP mapping and rollback reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Internal,
}

/// Stable, machine-checkable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    Forbidden,
    NotFound,
    DuplicateReading,
    NonMonotonicReading,
    ReadingNotFound,
    ReadingAlreadyBilled,
    BillAlreadyExists,
    TariffNotFound,
    NoReadingsToGenerate,
    BillNotFound,
    BillHasPayments,
    ForbiddenBillAccess,
    BillAlreadyPaid,
    AmountMismatch,
    PaymentNotFound,
    PaymentAlreadyDecided,
    InvalidDecision,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::DuplicateReading => "DUPLICATE_READING",
            ErrorKind::NonMonotonicReading => "NON_MONOTONIC_READING",
            ErrorKind::ReadingNotFound => "READING_NOT_FOUND",
            ErrorKind::ReadingAlreadyBilled => "READING_ALREADY_BILLED",
            ErrorKind::BillAlreadyExists => "BILL_ALREADY_EXISTS",
            ErrorKind::TariffNotFound => "TARIFF_NOT_FOUND",
            ErrorKind::NoReadingsToGenerate => "NO_READINGS_TO_GENERATE",
            ErrorKind::BillNotFound => "BILL_NOT_FOUND",
            ErrorKind::BillHasPayments => "BILL_HAS_PAYMENTS",
            ErrorKind::ForbiddenBillAccess => "FORBIDDEN_BILL_ACCESS",
            ErrorKind::BillAlreadyPaid => "BILL_ALREADY_PAID",
            ErrorKind::AmountMismatch => "AMOUNT_MISMATCH",
            ErrorKind::PaymentNotFound => "PAYMENT_NOT_FOUND",
            ErrorKind::PaymentAlreadyDecided => "PAYMENT_ALREADY_DECIDED",
            ErrorKind::InvalidDecision => "INVALID_DECISION",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::InvalidInput
            | ErrorKind::InvalidDecision
            | ErrorKind::NonMonotonicReading => ErrorCategory::Validation,
            ErrorKind::Forbidden | ErrorKind::ForbiddenBillAccess => ErrorCategory::Forbidden,
            ErrorKind::NotFound
            | ErrorKind::ReadingNotFound
            | ErrorKind::TariffNotFound
            | ErrorKind::NoReadingsToGenerate
            | ErrorKind::BillNotFound
            | ErrorKind::PaymentNotFound => ErrorCategory::NotFound,
            ErrorKind::DuplicateReading
            | ErrorKind::ReadingAlreadyBilled
            | ErrorKind::BillAlreadyExists
            | ErrorKind::BillHasPayments
            | ErrorKind::BillAlreadyPaid
            | ErrorKind::AmountMismatch
            | ErrorKind::PaymentAlreadyDecided
            | ErrorKind::Conflict => ErrorCategory::Conflict,
            ErrorKind::Internal => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller lacks the role required for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Generic missing resource (customers and other lookups)
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A meter reading for customer {customer_id} in {month} already exists")]
    DuplicateReading { customer_id: i64, month: String },

    #[error("Current meter ({current}) cannot be lower than previous meter ({previous})")]
    NonMonotonicReading { current: Decimal, previous: Decimal },

    #[error("Meter reading not found: {0}")]
    ReadingNotFound(String),

    #[error("Meter reading {0} already has a bill and cannot be deleted")]
    ReadingAlreadyBilled(i64),

    #[error("A bill for meter reading {0} has already been generated")]
    BillAlreadyExists(i64),

    #[error("No active tariff for {power_capacity} VA effective on {as_of}")]
    TariffNotFound { power_capacity: i32, as_of: String },

    #[error("No unbilled meter readings for {0}")]
    NoReadingsToGenerate(String),

    #[error("Bill {0} not found")]
    BillNotFound(i64),

    #[error("Bill {0} has payments and cannot be deleted")]
    BillHasPayments(i64),

    #[error("Access to bill {0} is not permitted")]
    ForbiddenBillAccess(i64),

    #[error("Bill {0} has already been paid")]
    BillAlreadyPaid(i64),

    #[error("Payment amount ({actual}) must equal the bill total ({expected})")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    #[error("Payment {0} not found")]
    PaymentNotFound(i64),

    #[error("Payment {id} has already been {status}")]
    PaymentAlreadyDecided { id: i64, status: String },

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    /// Uniqueness conflicts not covered by a more specific kind
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::InvalidInput,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::DuplicateReading { .. } => ErrorKind::DuplicateReading,
            AppError::NonMonotonicReading { .. } => ErrorKind::NonMonotonicReading,
            AppError::ReadingNotFound(_) => ErrorKind::ReadingNotFound,
            AppError::ReadingAlreadyBilled(_) => ErrorKind::ReadingAlreadyBilled,
            AppError::BillAlreadyExists(_) => ErrorKind::BillAlreadyExists,
            AppError::TariffNotFound { .. } => ErrorKind::TariffNotFound,
            AppError::NoReadingsToGenerate(_) => ErrorKind::NoReadingsToGenerate,
            AppError::BillNotFound(_) => ErrorKind::BillNotFound,
            AppError::BillHasPayments(_) => ErrorKind::BillHasPayments,
            AppError::ForbiddenBillAccess(_) => ErrorKind::ForbiddenBillAccess,
            AppError::BillAlreadyPaid(_) => ErrorKind::BillAlreadyPaid,
            AppError::AmountMismatch { .. } => ErrorKind::AmountMismatch,
            AppError::PaymentNotFound(_) => ErrorKind::PaymentNotFound,
            AppError::PaymentAlreadyDecided { .. } => ErrorKind::PaymentAlreadyDecided,
            AppError::InvalidDecision(_) => ErrorKind::InvalidDecision,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    /// Message safe to show to API clients; internal details stay in the logs
    pub fn public_message(&self) -> String {
        match self.category() {
            ErrorCategory::Internal => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        if self.category() == ErrorCategory::Internal {
            tracing::error!(error = %self, "Request failed with internal error");
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": self.public_message(),
            "code": self.kind(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::Forbidden => StatusCode::FORBIDDEN,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
