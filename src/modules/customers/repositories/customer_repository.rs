use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::core::{AppError, Result};
use crate::modules::customers::models::{Customer, CustomerStatus, PowerCapacity};
use crate::store::mysql::{db_error, MySqlUnitOfWork};

/// Customer lookups used by the billing workflow
#[async_trait]
pub trait CustomerRepository: Send {
    async fn find_customer(&mut self, id: i64) -> Result<Option<Customer>>;
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CustomerRow {
    id: i64,
    user_id: Option<i64>,
    customer_number: String,
    full_name: String,
    address: String,
    phone: Option<String>,
    power_capacity: i32,
    status: String,
    created_at: Option<DateTime<Utc>>,
}

impl CustomerRow {
    pub(crate) fn into_customer(self) -> Result<Customer> {
        let power_capacity = PowerCapacity::try_from(self.power_capacity)
            .map_err(|e| AppError::Internal(format!("Invalid power capacity in database: {}", e)))?;
        let status = CustomerStatus::from_str(&self.status)
            .map_err(|e| AppError::Internal(format!("Invalid customer status in database: {}", e)))?;

        Ok(Customer {
            id: self.id,
            user_id: self.user_id,
            customer_number: self.customer_number,
            full_name: self.full_name,
            address: self.address,
            phone: self.phone,
            power_capacity,
            status,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl CustomerRepository for MySqlUnitOfWork {
    async fn find_customer(&mut self, id: i64) -> Result<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, user_id, customer_number, full_name, address, phone,
                   power_capacity, status, created_at
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(db_error("fetch customer"))?;

        row.map(CustomerRow::into_customer).transpose()
    }
}
