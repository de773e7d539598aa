use std::sync::Arc;

use chrono::Duration;

use crate::config::BillingConfig;
use crate::core::identifiers::random_bill_number;
use crate::core::money::format_idr;
use crate::core::{AppError, BillingMonth, Clock, Result};
use crate::modules::bills::models::{
    BulkFailure, BulkGenerationReport, GeneratedBill, NewBill, ReadingSelector,
};
use crate::modules::bills::services::bill_calculator::BillCalculator;
use crate::modules::bills::repositories::BillRepository;
use crate::modules::customers::repositories::CustomerRepository;
use crate::modules::meter_readings::models::MeterReading;
use crate::modules::meter_readings::repositories::MeterReadingRepository;
use crate::modules::tariffs::services::TariffResolver;
use crate::store::{finish, Store, UnitOfWork};

/// Turns meter readings into bills, one at a time or for a whole month
pub struct BillGenerator {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: BillingConfig,
    calculator: BillCalculator,
}

impl BillGenerator {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: BillingConfig) -> Self {
        Self {
            store,
            clock,
            config,
            calculator: BillCalculator::new(),
        }
    }

    /// Generate the bill of one reading in a single unit of work
    ///
    /// Fails with `ReadingNotFound`, `BillAlreadyExists` or `TariffNotFound`;
    /// nothing is persisted on failure.
    pub async fn generate(&self, selector: ReadingSelector) -> Result<GeneratedBill> {
        let mut uow = self.store.begin().await?;
        let result = self.generate_in(uow.as_mut(), selector).await;
        finish(uow, result).await
    }

    async fn generate_in(
        &self,
        uow: &mut dyn UnitOfWork,
        selector: ReadingSelector,
    ) -> Result<GeneratedBill> {
        let reading = Self::resolve_reading(uow, selector).await?;

        if uow.find_bill_for_reading(reading.id).await?.is_some() {
            tracing::warn!(meter_reading_id = reading.id, "Bill already generated for reading");
            return Err(AppError::BillAlreadyExists(reading.id));
        }

        let customer = uow
            .find_customer(reading.customer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Customer {}", reading.customer_id)))?;

        let today = self.clock.today();
        let tariff = TariffResolver::resolve(uow, customer.power_capacity, today).await?;

        let usage_kwh = reading.usage_kwh();
        let charges = self.calculator.calculate(usage_kwh, &tariff);
        let bill_number = self.unique_bill_number(uow, &reading.reading_month).await?;

        let bill = NewBill {
            bill_number,
            customer_id: customer.id,
            meter_reading_id: reading.id,
            bill_month: reading.reading_month,
            usage_kwh,
            rate_per_kwh: tariff.rate_per_kwh,
            electricity_charge: charges.electricity_charge,
            admin_fee: charges.admin_fee,
            tax_percentage: tariff.tax_percentage,
            tax_amount: charges.tax_amount,
            total_amount: charges.total_amount,
            due_date: today + Duration::days(i64::from(self.config.due_days)),
        };
        let id = uow.insert_bill(&bill).await?;

        tracing::info!(
            bill_id = id,
            bill_number = %bill.bill_number,
            meter_reading_id = reading.id,
            customer_id = customer.id,
            tariff_id = tariff.id,
            total = %format_idr(bill.total_amount),
            due_date = %bill.due_date,
            "Bill generated"
        );

        Ok(GeneratedBill {
            id,
            bill_number: bill.bill_number,
            total_amount: bill.total_amount,
        })
    }

    async fn resolve_reading(
        uow: &mut dyn UnitOfWork,
        selector: ReadingSelector,
    ) -> Result<MeterReading> {
        match selector {
            ReadingSelector::ById(id) => uow
                .find_reading(id)
                .await?
                .ok_or_else(|| AppError::ReadingNotFound(format!("id {}", id))),
            ReadingSelector::ByCustomerMonth {
                customer_id,
                bill_month,
            } => uow
                .find_reading_by_month(customer_id, bill_month)
                .await?
                .ok_or_else(|| {
                    AppError::ReadingNotFound(format!(
                        "customer {} in {}",
                        customer_id, bill_month
                    ))
                }),
        }
    }

    /// Random candidates checked against existing bills, bounded by config
    async fn unique_bill_number(
        &self,
        uow: &mut dyn UnitOfWork,
        month: &BillingMonth,
    ) -> Result<String> {
        for attempt in 1..=self.config.number_generation_attempts {
            let candidate = random_bill_number(&self.config.bill_number_prefix, month);
            if !uow.bill_number_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(attempt, candidate = %candidate, "Bill number collision");
        }

        Err(AppError::Conflict(format!(
            "Could not allocate a unique bill number for {} after {} attempts",
            month, self.config.number_generation_attempts
        )))
    }

    /// Bill every unbilled reading of active customers for `month`
    /// (the current local month when `None`)
    ///
    /// Each reading is generated in its own unit of work: a failure is
    /// recorded in the report and the remaining readings are still billed.
    pub async fn generate_bulk(&self, month: Option<BillingMonth>) -> Result<BulkGenerationReport> {
        let month = month.unwrap_or_else(|| self.clock.current_month());

        let mut uow = self.store.begin().await?;
        let candidates = uow.unbilled_readings(month).await;
        let candidates = finish(uow, candidates).await?;

        if candidates.is_empty() {
            return Err(AppError::NoReadingsToGenerate(month.to_string()));
        }

        tracing::info!(month = %month, candidates = candidates.len(), "Starting bulk bill generation");

        let total_readings = candidates.len();
        let mut success_count = 0;
        let mut errors = Vec::new();

        for candidate in candidates {
            match self
                .generate(ReadingSelector::ById(candidate.meter_reading_id))
                .await
            {
                Ok(_) => success_count += 1,
                Err(err) => {
                    tracing::warn!(
                        customer_id = candidate.customer_id,
                        meter_reading_id = candidate.meter_reading_id,
                        kind = %err.kind(),
                        error = %err,
                        "Bill generation failed for candidate"
                    );
                    errors.push(BulkFailure {
                        customer_id: candidate.customer_id,
                        customer_name: candidate.customer_name,
                        kind: err.kind(),
                        message: err.public_message(),
                    });
                }
            }
        }

        let report = BulkGenerationReport {
            month,
            total_readings,
            success_count,
            failed_count: errors.len(),
            errors,
        };

        tracing::info!(
            month = %month,
            total = report.total_readings,
            succeeded = report.success_count,
            failed = report.failed_count,
            "Bulk bill generation finished"
        );

        Ok(report)
    }
}
