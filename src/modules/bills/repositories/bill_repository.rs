use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::{AppError, BillingMonth, Result};
use crate::modules::bills::models::{Bill, BillStatus, BillingCandidate, NewBill};
use crate::store::mysql::{db_error, is_unique_violation_on, MySqlUnitOfWork};

#[async_trait]
pub trait BillRepository: Send {
    /// Fetch a bill, locking it for the rest of the unit of work
    async fn find_bill(&mut self, id: i64) -> Result<Option<Bill>>;

    async fn find_bill_for_reading(&mut self, meter_reading_id: i64) -> Result<Option<Bill>>;

    async fn bill_number_exists(&mut self, bill_number: &str) -> Result<bool>;

    /// Insert and return the new id. A second bill for the same reading fails
    /// with `BillAlreadyExists`, a reused number with `Conflict`.
    async fn insert_bill(&mut self, bill: &NewBill) -> Result<i64>;

    async fn update_bill_status(&mut self, id: i64, status: BillStatus) -> Result<bool>;

    async fn delete_bill(&mut self, id: i64) -> Result<bool>;

    /// Readings of `active` customers for `month` that no bill references yet
    async fn unbilled_readings(&mut self, month: BillingMonth) -> Result<Vec<BillingCandidate>>;
}

#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: i64,
    bill_number: String,
    customer_id: i64,
    meter_reading_id: i64,
    bill_month: String,
    usage_kwh: Decimal,
    rate_per_kwh: Decimal,
    electricity_charge: Decimal,
    admin_fee: Decimal,
    tax_percentage: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    due_date: NaiveDate,
    status: String,
    created_at: Option<DateTime<Utc>>,
}

impl BillRow {
    fn into_bill(self) -> Result<Bill> {
        let bill_month: BillingMonth = self
            .bill_month
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid bill month in database: {}", e)))?;
        let status = BillStatus::from_str(&self.status)
            .map_err(|e| AppError::Internal(format!("Invalid bill status in database: {}", e)))?;

        Ok(Bill {
            id: self.id,
            bill_number: self.bill_number,
            customer_id: self.customer_id,
            meter_reading_id: self.meter_reading_id,
            bill_month,
            usage_kwh: self.usage_kwh,
            rate_per_kwh: self.rate_per_kwh,
            electricity_charge: self.electricity_charge,
            admin_fee: self.admin_fee,
            tax_percentage: self.tax_percentage,
            tax_amount: self.tax_amount,
            total_amount: self.total_amount,
            due_date: self.due_date,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    meter_reading_id: i64,
    customer_id: i64,
    customer_name: String,
}

const BILL_COLUMNS: &str = "id, bill_number, customer_id, meter_reading_id, bill_month, usage_kwh, \
     rate_per_kwh, electricity_charge, admin_fee, tax_percentage, tax_amount, total_amount, \
     due_date, status, created_at";

#[async_trait]
impl BillRepository for MySqlUnitOfWork {
    async fn find_bill(&mut self, id: i64) -> Result<Option<Bill>> {
        let sql = format!("SELECT {} FROM bills WHERE id = ? FOR UPDATE", BILL_COLUMNS);
        let row = sqlx::query_as::<_, BillRow>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error("fetch bill"))?;

        row.map(BillRow::into_bill).transpose()
    }

    async fn find_bill_for_reading(&mut self, meter_reading_id: i64) -> Result<Option<Bill>> {
        let sql = format!(
            "SELECT {} FROM bills WHERE meter_reading_id = ? FOR UPDATE",
            BILL_COLUMNS
        );
        let row = sqlx::query_as::<_, BillRow>(&sql)
            .bind(meter_reading_id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error("fetch bill for meter reading"))?;

        row.map(BillRow::into_bill).transpose()
    }

    async fn bill_number_exists(&mut self, bill_number: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE bill_number = ?")
            .bind(bill_number)
            .fetch_one(self.conn()?)
            .await
            .map_err(db_error("check bill number"))?;

        Ok(count > 0)
    }

    async fn insert_bill(&mut self, bill: &NewBill) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO bills (
                bill_number, customer_id, meter_reading_id, bill_month, usage_kwh,
                rate_per_kwh, electricity_charge, admin_fee, tax_percentage, tax_amount,
                total_amount, due_date, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bill.bill_number)
        .bind(bill.customer_id)
        .bind(bill.meter_reading_id)
        .bind(bill.bill_month.to_string())
        .bind(bill.usage_kwh)
        .bind(bill.rate_per_kwh)
        .bind(bill.electricity_charge)
        .bind(bill.admin_fee)
        .bind(bill.tax_percentage)
        .bind(bill.tax_amount)
        .bind(bill.total_amount)
        .bind(bill.due_date)
        .bind(BillStatus::Unpaid.to_string())
        .execute(self.conn()?)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, "uq_bills_meter_reading") {
                return AppError::BillAlreadyExists(bill.meter_reading_id);
            }
            if is_unique_violation_on(&e, "uq_bills_number") {
                return AppError::Conflict(format!(
                    "Bill number {} is already in use",
                    bill.bill_number
                ));
            }
            AppError::Internal(format!("Failed to create bill: {}", e))
        })?;

        Ok(result.last_insert_id() as i64)
    }

    async fn update_bill_status(&mut self, id: i64, status: BillStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE bills SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("update bill status"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_bill(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bills WHERE id = ?")
            .bind(id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("delete bill"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn unbilled_readings(&mut self, month: BillingMonth) -> Result<Vec<BillingCandidate>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT mr.id AS meter_reading_id, c.id AS customer_id, c.full_name AS customer_name
            FROM meter_readings mr
            JOIN customers c ON c.id = mr.customer_id
            LEFT JOIN bills b ON b.meter_reading_id = mr.id
            WHERE mr.reading_month = ? AND c.status = 'active' AND b.id IS NULL
            ORDER BY mr.id
            "#,
        )
        .bind(month.to_string())
        .fetch_all(self.conn()?)
        .await
        .map_err(db_error("fetch unbilled meter readings"))?;

        Ok(rows
            .into_iter()
            .map(|row| BillingCandidate {
                meter_reading_id: row.meter_reading_id,
                customer_id: row.customer_id,
                customer_name: row.customer_name,
            })
            .collect())
    }
}
