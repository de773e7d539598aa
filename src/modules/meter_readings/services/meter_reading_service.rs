use std::sync::Arc;

use rust_decimal::Decimal;

use crate::core::{AppError, BillingMonth, Caller, Result};
use crate::modules::meter_readings::models::{
    LastReading, NewMeterReading, RecordReadingRequest, RecordedReading, UpdateReadingRequest,
};
use crate::modules::bills::repositories::BillRepository;
use crate::modules::customers::repositories::CustomerRepository;
use crate::modules::meter_readings::repositories::MeterReadingRepository;
use crate::store::{finish, Store, UnitOfWork};

/// Accepts meter readings and keeps usage non-negative
pub struct MeterReadingService {
    store: Arc<dyn Store>,
}

impl MeterReadingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record the reading of one customer for one month
    ///
    /// `previous_meter` is derived from the latest earlier month (0 for the first
    /// reading) and never taken from the caller.
    pub async fn record_reading(
        &self,
        caller: &Caller,
        request: RecordReadingRequest,
    ) -> Result<RecordedReading> {
        let month = request.validate()?;

        let mut uow = self.store.begin().await?;
        let result = Self::record_in(uow.as_mut(), caller, month, request).await;
        finish(uow, result).await
    }

    async fn record_in(
        uow: &mut dyn UnitOfWork,
        caller: &Caller,
        month: BillingMonth,
        request: RecordReadingRequest,
    ) -> Result<RecordedReading> {
        let customer = uow.find_customer(request.customer_id).await?.ok_or_else(|| {
            AppError::validation(format!("Customer {} does not exist", request.customer_id))
        })?;

        if uow
            .find_reading_by_month(customer.id, month)
            .await?
            .is_some()
        {
            tracing::warn!(customer_id = customer.id, month = %month, "Duplicate meter reading");
            return Err(AppError::DuplicateReading {
                customer_id: customer.id,
                month: month.to_string(),
            });
        }

        let previous_meter = uow
            .latest_reading_before(customer.id, month)
            .await?
            .map(|reading| reading.current_meter)
            .unwrap_or(Decimal::ZERO);

        if request.current_meter < previous_meter {
            tracing::warn!(
                customer_id = customer.id,
                current = %request.current_meter,
                previous = %previous_meter,
                "Rejected non-monotonic meter reading"
            );
            return Err(AppError::NonMonotonicReading {
                current: request.current_meter,
                previous: previous_meter,
            });
        }

        let reading = NewMeterReading {
            customer_id: customer.id,
            reading_month: month,
            previous_meter,
            current_meter: request.current_meter,
            reading_date: request.reading_date,
            recorded_by: Some(caller.user_id),
            notes: request.notes,
        };
        let id = uow.insert_reading(&reading).await?;
        let usage_kwh = reading.current_meter - previous_meter;

        tracing::info!(
            reading_id = id,
            customer_id = customer.id,
            month = %month,
            usage_kwh = %usage_kwh,
            "Meter reading recorded"
        );

        Ok(RecordedReading {
            id,
            previous_meter,
            usage_kwh,
        })
    }

    /// Correct the current meter of a reading; `previous_meter` stays as recorded
    pub async fn update_reading(
        &self,
        id: i64,
        request: UpdateReadingRequest,
    ) -> Result<RecordedReading> {
        request.validate()?;

        let mut uow = self.store.begin().await?;
        let result = Self::update_in(uow.as_mut(), id, request).await;
        finish(uow, result).await
    }

    async fn update_in(
        uow: &mut dyn UnitOfWork,
        id: i64,
        request: UpdateReadingRequest,
    ) -> Result<RecordedReading> {
        let reading = uow
            .find_reading(id)
            .await?
            .ok_or_else(|| AppError::ReadingNotFound(id.to_string()))?;

        if request.current_meter < reading.previous_meter {
            return Err(AppError::NonMonotonicReading {
                current: request.current_meter,
                previous: reading.previous_meter,
            });
        }

        let updated = uow
            .update_reading(
                id,
                request.current_meter,
                request.reading_date,
                request.notes.as_deref(),
            )
            .await?;
        if !updated {
            return Err(AppError::ReadingNotFound(id.to_string()));
        }

        tracing::info!(reading_id = id, current_meter = %request.current_meter, "Meter reading updated");

        Ok(RecordedReading {
            id,
            previous_meter: reading.previous_meter,
            usage_kwh: request.current_meter - reading.previous_meter,
        })
    }

    /// Delete a reading that has not been billed yet
    pub async fn delete_reading(&self, id: i64) -> Result<()> {
        let mut uow = self.store.begin().await?;
        let result = Self::delete_in(uow.as_mut(), id).await;
        finish(uow, result).await
    }

    async fn delete_in(uow: &mut dyn UnitOfWork, id: i64) -> Result<()> {
        uow.find_reading(id)
            .await?
            .ok_or_else(|| AppError::ReadingNotFound(id.to_string()))?;

        if uow.find_bill_for_reading(id).await?.is_some() {
            return Err(AppError::ReadingAlreadyBilled(id));
        }

        if !uow.delete_reading(id).await? {
            return Err(AppError::ReadingNotFound(id.to_string()));
        }

        tracing::info!(reading_id = id, "Meter reading deleted");
        Ok(())
    }

    /// Latest reading of a customer, used to pre-fill the next entry
    pub async fn last_reading(&self, customer_id: i64) -> Result<LastReading> {
        let mut uow = self.store.begin().await?;
        let result = Self::last_reading_in(uow.as_mut(), customer_id).await;
        finish(uow, result).await
    }

    async fn last_reading_in(uow: &mut dyn UnitOfWork, customer_id: i64) -> Result<LastReading> {
        let customer = uow
            .find_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Customer {}", customer_id)))?;

        let last_reading = uow.latest_reading(customer_id).await?;
        let last_meter = last_reading
            .as_ref()
            .map(|reading| reading.current_meter)
            .unwrap_or(Decimal::ZERO);

        Ok(LastReading {
            customer,
            last_reading,
            last_meter,
        })
    }
}
