//! Transactional storage interface.
//!
//! Services open one [`UnitOfWork`] per operation, run every read and write through
//! it, then hand it to [`finish`]. A unit of work that is dropped without commit
//! rolls back and releases its connection (or in-memory lock).

use async_trait::async_trait;

use crate::core::Result;
use crate::modules::bills::repositories::BillRepository;
use crate::modules::customers::repositories::CustomerRepository;
use crate::modules::meter_readings::repositories::MeterReadingRepository;
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::tariffs::repositories::TariffRepository;

pub mod memory;
pub mod mysql;

pub use memory::{MemoryStore, MemoryUnitOfWork};
pub use mysql::{MySqlStore, MySqlUnitOfWork};

/// Source of units of work
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

/// One database transaction with every repository available on it
#[async_trait]
pub trait UnitOfWork:
    CustomerRepository
    + TariffRepository
    + MeterReadingRepository
    + BillRepository
    + PaymentRepository
    + Send
{
    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}

/// Commit on `Ok`, roll back on `Err`, and return the operation result
///
/// A failed rollback is logged and the original error is returned; the
/// connection is released either way when `uow` is dropped.
pub async fn finish<T>(mut uow: Box<dyn UnitOfWork>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::error!(
                    error = %rollback_err,
                    cause = %err,
                    "Rollback failed"
                );
            } else {
                tracing::debug!(kind = %err.kind(), "Unit of work rolled back");
            }
            Err(err)
        }
    }
}
