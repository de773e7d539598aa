use async_trait::async_trait;
use sqlx::{MySql, MySqlConnection, MySqlPool, Transaction};

use super::{Store, UnitOfWork};
use crate::core::{AppError, Result};

/// MySQL-backed store
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Get the database connection pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        Ok(Box::new(MySqlUnitOfWork { tx: Some(tx) }))
    }
}

/// One MySQL transaction. Repository impls live next to their modules.
pub struct MySqlUnitOfWork {
    tx: Option<Transaction<'static, MySql>>,
}

impl MySqlUnitOfWork {
    /// Connection of the open transaction
    pub(crate) fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::internal("Unit of work already finished"))
    }
}

#[async_trait]
impl UnitOfWork for MySqlUnitOfWork {
    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::internal("Unit of work already finished"))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx
                .rollback()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to roll back transaction: {}", e))),
            None => Ok(()),
        }
    }
}

/// True when `err` is a unique-key violation on the named index
///
/// MySQL reports the key name in the message: `Duplicate entry '..' for key 'bills.uq_bills_meter_reading'`.
pub(crate) fn is_unique_violation_on(err: &sqlx::Error, index: &str) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation() && db_err.message().contains(index))
        .unwrap_or(false)
}

/// Wrap a driver error with the operation that failed
pub(crate) fn db_error(operation: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| AppError::Internal(format!("Failed to {}: {}", operation, e))
}
