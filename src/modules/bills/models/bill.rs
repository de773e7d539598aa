use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{AppError, BillingMonth, ErrorKind};
use crate::modules::payments::models::Payment;

/// Persisted bill status
///
/// `overdue` is never stored; see [`derive_display_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    #[default]
    Unpaid,
    Paid,
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillStatus::Unpaid => write!(f, "unpaid"),
            BillStatus::Paid => write!(f, "paid"),
        }
    }
}

impl FromStr for BillStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(BillStatus::Unpaid),
            "paid" => Ok(BillStatus::Paid),
            "overdue" => Err(AppError::validation(
                "Overdue is derived from the due date and cannot be stored",
            )),
            other => Err(AppError::validation(format!("Invalid bill status '{}'", other))),
        }
    }
}

/// Status shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Unpaid,
    Paid,
    Overdue,
}

/// Bill for one meter reading, carrying the tariff values it was computed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub bill_number: String,
    pub customer_id: i64,
    pub meter_reading_id: i64,
    pub bill_month: BillingMonth,
    pub usage_kwh: Decimal,
    pub rate_per_kwh: Decimal,
    pub electricity_charge: Decimal,
    pub admin_fee: Decimal,
    pub tax_percentage: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Bill {
    pub fn is_paid(&self) -> bool {
        self.status == BillStatus::Paid
    }
}

/// `Paid` when paid, `Overdue` when unpaid past the due date, else `Unpaid`
///
/// Nothing rewrites the stored status; callers derive this on read.
pub fn derive_display_status(bill: &Bill, today: NaiveDate) -> DisplayStatus {
    match bill.status {
        BillStatus::Paid => DisplayStatus::Paid,
        BillStatus::Unpaid if today > bill.due_date => DisplayStatus::Overdue,
        BillStatus::Unpaid => DisplayStatus::Unpaid,
    }
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub bill_number: String,
    pub customer_id: i64,
    pub meter_reading_id: i64,
    pub bill_month: BillingMonth,
    pub usage_kwh: Decimal,
    pub rate_per_kwh: Decimal,
    pub electricity_charge: Decimal,
    pub admin_fee: Decimal,
    pub tax_percentage: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub due_date: NaiveDate,
}

/// Which reading to bill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingSelector {
    ById(i64),
    ByCustomerMonth {
        customer_id: i64,
        bill_month: BillingMonth,
    },
}

/// Body of `POST /api/bills/generate`: a reading id, or a customer and month
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateBillRequest {
    #[serde(default)]
    pub meter_reading_id: Option<i64>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub bill_month: Option<BillingMonth>,
}

impl GenerateBillRequest {
    pub fn into_selector(self) -> Result<ReadingSelector, AppError> {
        match (self.meter_reading_id, self.customer_id, self.bill_month) {
            (Some(id), _, _) => Ok(ReadingSelector::ById(id)),
            (None, Some(customer_id), Some(bill_month)) => Ok(ReadingSelector::ByCustomerMonth {
                customer_id,
                bill_month,
            }),
            _ => Err(AppError::validation(
                "Either meter_reading_id or customer_id with bill_month is required",
            )),
        }
    }
}

/// Unbilled reading of an active customer, found by the bulk query
#[derive(Debug, Clone, PartialEq)]
pub struct BillingCandidate {
    pub meter_reading_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedBill {
    pub id: i64,
    pub bill_number: String,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkGenerationRequest {
    /// Defaults to the current local month
    #[serde(default)]
    pub bill_month: Option<BillingMonth>,
}

impl BulkGenerationRequest {
    /// Decodes an optional JSON body; only an empty body means "no month"
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("Invalid request body: {}", e)))
    }
}

/// One candidate that could not be billed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub customer_id: i64,
    pub customer_name: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkGenerationReport {
    pub month: BillingMonth,
    pub total_readings: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBillStatusRequest {
    pub status: String,
}

/// Bill with its payment attempts, newest first
#[derive(Debug, Clone, Serialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub display_status: DisplayStatus,
    pub payments: Vec<Payment>,
}
