use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{AppError, BillingMonth, Result};
use crate::modules::customers::models::Customer;

/// Longest accepted free-text note on a reading
const MAX_NOTES_LEN: usize = 500;

/// Monthly meter reading of one customer
///
/// `previous_meter` is fixed when the reading is recorded and
/// `current_meter >= previous_meter` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub id: i64,
    pub customer_id: i64,
    pub reading_month: BillingMonth,
    pub previous_meter: Decimal,
    pub current_meter: Decimal,
    pub reading_date: NaiveDate,
    /// Admin account that recorded the reading
    pub recorded_by: Option<i64>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl MeterReading {
    /// Consumption for the month, in kWh
    pub fn usage_kwh(&self) -> Decimal {
        self.current_meter - self.previous_meter
    }
}

/// Row to insert; `previous_meter` has already been derived
#[derive(Debug, Clone)]
pub struct NewMeterReading {
    pub customer_id: i64,
    pub reading_month: BillingMonth,
    pub previous_meter: Decimal,
    pub current_meter: Decimal,
    pub reading_date: NaiveDate,
    pub recorded_by: Option<i64>,
    pub notes: Option<String>,
}

/// Input of `record_reading`
#[derive(Debug, Clone, Deserialize)]
pub struct RecordReadingRequest {
    pub customer_id: i64,
    /// `YYYY-MM`
    pub reading_month: String,
    pub current_meter: Decimal,
    pub reading_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecordReadingRequest {
    /// Syntactic checks; returns the parsed month
    pub fn validate(&self) -> Result<BillingMonth> {
        if self.customer_id <= 0 {
            return Err(AppError::validation("Customer ID is required"));
        }
        let month: BillingMonth = self.reading_month.parse()?;
        validate_meter_value(self.current_meter)?;
        validate_notes(self.notes.as_deref())?;
        Ok(month)
    }
}

/// Input of `update_reading`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReadingRequest {
    pub current_meter: Decimal,
    pub reading_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateReadingRequest {
    pub fn validate(&self) -> Result<()> {
        validate_meter_value(self.current_meter)?;
        validate_notes(self.notes.as_deref())
    }
}

/// Outcome of recording or updating a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedReading {
    pub id: i64,
    pub previous_meter: Decimal,
    pub usage_kwh: Decimal,
}

/// Latest reading of a customer, used to pre-fill the next entry
#[derive(Debug, Clone, Serialize)]
pub struct LastReading {
    pub customer: Customer,
    pub last_reading: Option<MeterReading>,
    /// 0 when the customer has no reading yet
    pub last_meter: Decimal,
}

fn validate_meter_value(value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(AppError::validation("Meter value cannot be negative"));
    }
    if value.normalize().scale() > 2 {
        return Err(AppError::validation(
            "Meter value cannot have more than 2 decimal places",
        ));
    }
    Ok(())
}

fn validate_notes(notes: Option<&str>) -> Result<()> {
    match notes {
        Some(text) if text.chars().count() > MAX_NOTES_LEN => Err(AppError::validation(format!(
            "Notes cannot exceed {} characters",
            MAX_NOTES_LEN
        ))),
        _ => Ok(()),
    }
}
