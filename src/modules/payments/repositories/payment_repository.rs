use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::{AppError, BillingMonth, Result};
use crate::modules::payments::models::{
    NewPayment, Payment, PaymentDecision, PaymentMethod, PaymentStatistics, PaymentStatus,
    StatusCount, StatusTotals,
};
use crate::store::mysql::{db_error, is_unique_violation_on, MySqlUnitOfWork};

#[async_trait]
pub trait PaymentRepository: Send {
    /// Fetch a payment, locking it for the rest of the unit of work
    async fn find_payment(&mut self, id: i64) -> Result<Option<Payment>>;

    /// All attempts for a bill, newest first
    async fn payments_for_bill(&mut self, bill_id: i64) -> Result<Vec<Payment>>;

    async fn count_payments_for_bill(&mut self, bill_id: i64) -> Result<i64>;

    async fn payment_number_exists(&mut self, payment_number: &str) -> Result<bool>;

    /// Insert a `pending` payment and return its id
    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<i64>;

    /// Apply a decision only while the payment is still `pending`.
    /// Returns false when it was already decided or does not exist.
    async fn record_decision(&mut self, id: i64, decision: &PaymentDecision) -> Result<bool>;

    /// Counts and sums per status, filtered by the local month of `payment_date`
    async fn payment_statistics(&mut self, month: Option<BillingMonth>) -> Result<PaymentStatistics>;
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    bill_id: i64,
    payment_number: String,
    payment_method: String,
    amount: Decimal,
    payment_date: DateTime<Utc>,
    status: String,
    notes: Option<String>,
    verified_by: Option<i64>,
    verification_date: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment> {
        let payment_method = PaymentMethod::from_str(&self.payment_method)
            .map_err(|e| AppError::Internal(format!("Invalid payment method in database: {}", e)))?;
        let status = PaymentStatus::from_str(&self.status)
            .map_err(|e| AppError::Internal(format!("Invalid payment status in database: {}", e)))?;

        Ok(Payment {
            id: self.id,
            bill_id: self.bill_id,
            payment_number: self.payment_number,
            payment_method,
            amount: self.amount,
            payment_date: self.payment_date,
            status,
            notes: self.notes,
            verified_by: self.verified_by,
            verification_date: self.verification_date,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusSummaryRow {
    status: String,
    count: i64,
    total: Decimal,
}

const PAYMENT_COLUMNS: &str = "id, bill_id, payment_number, payment_method, amount, payment_date, \
     status, notes, verified_by, verification_date";

#[async_trait]
impl PaymentRepository for MySqlUnitOfWork {
    async fn find_payment(&mut self, id: i64) -> Result<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE id = ? FOR UPDATE", PAYMENT_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error("fetch payment"))?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn payments_for_bill(&mut self, bill_id: i64) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE bill_id = ? ORDER BY payment_date DESC, id DESC",
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(bill_id)
            .fetch_all(self.conn()?)
            .await
            .map_err(db_error("fetch payments for bill"))?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn count_payments_for_bill(&mut self, bill_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE bill_id = ?")
            .bind(bill_id)
            .fetch_one(self.conn()?)
            .await
            .map_err(db_error("count payments for bill"))
    }

    async fn payment_number_exists(&mut self, payment_number: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE payment_number = ?")
                .bind(payment_number)
                .fetch_one(self.conn()?)
                .await
                .map_err(db_error("check payment number"))?;

        Ok(count > 0)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                bill_id, payment_number, payment_method, amount, payment_date, notes, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.bill_id)
        .bind(&payment.payment_number)
        .bind(payment.payment_method.to_string())
        .bind(payment.amount)
        .bind(payment.payment_date)
        .bind(payment.notes.as_deref())
        .bind(PaymentStatus::Pending.to_string())
        .execute(self.conn()?)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, "uq_payments_number") {
                return AppError::Conflict(format!(
                    "Payment number {} is already in use",
                    payment.payment_number
                ));
            }
            AppError::Internal(format!("Failed to create payment: {}", e))
        })?;

        Ok(result.last_insert_id() as i64)
    }

    async fn record_decision(&mut self, id: i64, decision: &PaymentDecision) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?, verified_by = ?, verification_date = ?, notes = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(decision.status.to_string())
        .bind(decision.verified_by)
        .bind(decision.verification_date)
        .bind(decision.notes.as_deref())
        .bind(id)
        .execute(self.conn()?)
        .await
        .map_err(db_error("record payment decision"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn payment_statistics(&mut self, month: Option<BillingMonth>) -> Result<PaymentStatistics> {
        // payment_date is stored in UTC; months are counted in Asia/Jakarta
        let month = month.map(|m| m.to_string());
        let rows = sqlx::query_as::<_, StatusSummaryRow>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS total
            FROM payments
            WHERE ? IS NULL
               OR DATE_FORMAT(CONVERT_TZ(payment_date, '+00:00', '+07:00'), '%Y-%m') = ?
            GROUP BY status
            "#,
        )
        .bind(month.as_deref())
        .bind(month.as_deref())
        .fetch_all(self.conn()?)
        .await
        .map_err(db_error("fetch payment statistics"))?;

        let mut stats = PaymentStatistics::default();
        for row in rows {
            match PaymentStatus::from_str(&row.status) {
                Ok(PaymentStatus::Verified) => {
                    stats.verified = StatusTotals {
                        count: row.count,
                        total_amount: row.total,
                    }
                }
                Ok(PaymentStatus::Pending) => {
                    stats.pending = StatusTotals {
                        count: row.count,
                        total_amount: row.total,
                    }
                }
                Ok(PaymentStatus::Rejected) => stats.rejected = StatusCount { count: row.count },
                Err(e) => {
                    return Err(AppError::Internal(format!(
                        "Invalid payment status in database: {}",
                        e
                    )))
                }
            }
        }

        Ok(stats)
    }
}
