use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::core::{AppError, BillingMonth, Result};
use crate::modules::meter_readings::models::{MeterReading, NewMeterReading};
use crate::store::mysql::{db_error, is_unique_violation_on, MySqlUnitOfWork};

#[async_trait]
pub trait MeterReadingRepository: Send {
    /// Fetch a reading, locking it for the rest of the unit of work
    async fn find_reading(&mut self, id: i64) -> Result<Option<MeterReading>>;

    async fn find_reading_by_month(
        &mut self,
        customer_id: i64,
        month: BillingMonth,
    ) -> Result<Option<MeterReading>>;

    /// Chronologically latest reading with `reading_month < month`
    async fn latest_reading_before(
        &mut self,
        customer_id: i64,
        month: BillingMonth,
    ) -> Result<Option<MeterReading>>;

    async fn latest_reading(&mut self, customer_id: i64) -> Result<Option<MeterReading>>;

    /// Insert and return the new id. A second reading for the same
    /// `(customer, month)` fails with `DuplicateReading`.
    async fn insert_reading(&mut self, reading: &NewMeterReading) -> Result<i64>;

    /// Returns false when no row matched
    async fn update_reading(
        &mut self,
        id: i64,
        current_meter: Decimal,
        reading_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<bool>;

    /// Returns false when no row matched
    async fn delete_reading(&mut self, id: i64) -> Result<bool>;
}

#[derive(Debug, sqlx::FromRow)]
struct MeterReadingRow {
    id: i64,
    customer_id: i64,
    reading_month: String,
    previous_meter: Decimal,
    current_meter: Decimal,
    reading_date: NaiveDate,
    recorded_by: Option<i64>,
    notes: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl MeterReadingRow {
    fn into_reading(self) -> Result<MeterReading> {
        let reading_month: BillingMonth = self
            .reading_month
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid reading month in database: {}", e)))?;

        Ok(MeterReading {
            id: self.id,
            customer_id: self.customer_id,
            reading_month,
            previous_meter: self.previous_meter,
            current_meter: self.current_meter,
            reading_date: self.reading_date,
            recorded_by: self.recorded_by,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

const READING_COLUMNS: &str = "id, customer_id, reading_month, previous_meter, current_meter, \
     reading_date, recorded_by, notes, created_at";

#[async_trait]
impl MeterReadingRepository for MySqlUnitOfWork {
    async fn find_reading(&mut self, id: i64) -> Result<Option<MeterReading>> {
        let sql = format!(
            "SELECT {} FROM meter_readings WHERE id = ? FOR UPDATE",
            READING_COLUMNS
        );
        let row = sqlx::query_as::<_, MeterReadingRow>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error("fetch meter reading"))?;

        row.map(MeterReadingRow::into_reading).transpose()
    }

    async fn find_reading_by_month(
        &mut self,
        customer_id: i64,
        month: BillingMonth,
    ) -> Result<Option<MeterReading>> {
        let sql = format!(
            "SELECT {} FROM meter_readings WHERE customer_id = ? AND reading_month = ? FOR UPDATE",
            READING_COLUMNS
        );
        let row = sqlx::query_as::<_, MeterReadingRow>(&sql)
            .bind(customer_id)
            .bind(month.to_string())
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error("fetch meter reading by month"))?;

        row.map(MeterReadingRow::into_reading).transpose()
    }

    async fn latest_reading_before(
        &mut self,
        customer_id: i64,
        month: BillingMonth,
    ) -> Result<Option<MeterReading>> {
        // `YYYY-MM` strings sort chronologically
        let sql = format!(
            "SELECT {} FROM meter_readings \
             WHERE customer_id = ? AND reading_month < ? \
             ORDER BY reading_month DESC LIMIT 1",
            READING_COLUMNS
        );
        let row = sqlx::query_as::<_, MeterReadingRow>(&sql)
            .bind(customer_id)
            .bind(month.to_string())
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error("fetch previous meter reading"))?;

        row.map(MeterReadingRow::into_reading).transpose()
    }

    async fn latest_reading(&mut self, customer_id: i64) -> Result<Option<MeterReading>> {
        let sql = format!(
            "SELECT {} FROM meter_readings WHERE customer_id = ? \
             ORDER BY reading_month DESC LIMIT 1",
            READING_COLUMNS
        );
        let row = sqlx::query_as::<_, MeterReadingRow>(&sql)
            .bind(customer_id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error("fetch latest meter reading"))?;

        row.map(MeterReadingRow::into_reading).transpose()
    }

    async fn insert_reading(&mut self, reading: &NewMeterReading) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO meter_readings (
                customer_id, reading_month, previous_meter, current_meter,
                reading_date, recorded_by, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reading.customer_id)
        .bind(reading.reading_month.to_string())
        .bind(reading.previous_meter)
        .bind(reading.current_meter)
        .bind(reading.reading_date)
        .bind(reading.recorded_by)
        .bind(reading.notes.as_deref())
        .execute(self.conn()?)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, "uq_readings_customer_month") {
                return AppError::DuplicateReading {
                    customer_id: reading.customer_id,
                    month: reading.reading_month.to_string(),
                };
            }
            AppError::Internal(format!("Failed to create meter reading: {}", e))
        })?;

        Ok(result.last_insert_id() as i64)
    }

    async fn update_reading(
        &mut self,
        id: i64,
        current_meter: Decimal,
        reading_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE meter_readings
            SET current_meter = ?, reading_date = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(current_meter)
        .bind(reading_date)
        .bind(notes)
        .bind(id)
        .execute(self.conn()?)
        .await
        .map_err(db_error("update meter reading"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_reading(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meter_readings WHERE id = ?")
            .bind(id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("delete meter reading"))?;

        Ok(result.rows_affected() > 0)
    }
}
