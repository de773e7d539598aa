//! In-process store with the same transactional semantics as the MySQL one.
//!
//! A unit of work holds the store lock for its whole lifetime and mutates a copy
//! of the state; `commit` writes the copy back, anything else discards it. Units
//! of work are therefore serializable. Used by the test suites and for local runs
//! without a database.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, UnitOfWork};
use crate::core::clock::to_jakarta;
use crate::core::{AppError, BillingMonth, Result};
use crate::modules::bills::models::{Bill, BillStatus, BillingCandidate, NewBill};
use crate::modules::bills::repositories::BillRepository;
use crate::modules::customers::models::{Customer, CustomerStatus, NewCustomer, PowerCapacity};
use crate::modules::customers::repositories::CustomerRepository;
use crate::modules::meter_readings::models::{MeterReading, NewMeterReading};
use crate::modules::meter_readings::repositories::MeterReadingRepository;
use crate::modules::payments::models::{
    NewPayment, Payment, PaymentDecision, PaymentStatistics, PaymentStatus,
};
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::tariffs::models::{NewTariff, Tariff};
use crate::modules::tariffs::repositories::TariffRepository;

#[derive(Debug, Default, Clone)]
struct Sequences {
    customers: i64,
    tariffs: i64,
    readings: i64,
    bills: i64,
    payments: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default, Clone)]
struct MemoryState {
    customers: BTreeMap<i64, Customer>,
    tariffs: BTreeMap<i64, Tariff>,
    readings: BTreeMap<i64, MeterReading>,
    bills: BTreeMap<i64, Bill>,
    payments: BTreeMap<i64, Payment>,
    ids: Sequences,
    /// Repository operations that fail with an internal error
    failures: HashSet<String>,
}

impl MemoryState {
    fn check_failure(&self, operation: &str) -> Result<()> {
        if self.failures.contains(operation) {
            return Err(AppError::Internal(format!("Injected failure in {}", operation)));
        }
        Ok(())
    }
}

/// Mutex-guarded in-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer, enforcing a unique customer number
    pub async fn add_customer(&self, customer: NewCustomer) -> Result<Customer> {
        customer.validate()?;
        let mut state = self.state.lock().await;

        if state
            .customers
            .values()
            .any(|c| c.customer_number == customer.customer_number)
        {
            return Err(AppError::Conflict(format!(
                "Customer number {} is already in use",
                customer.customer_number
            )));
        }

        let id = next(&mut state.ids.customers);
        let created = Customer {
            id,
            user_id: customer.user_id,
            customer_number: customer.customer_number,
            full_name: customer.full_name,
            address: customer.address,
            phone: customer.phone,
            power_capacity: customer.power_capacity,
            status: customer.status,
            created_at: Some(Utc::now()),
        };
        state.customers.insert(id, created.clone());
        Ok(created)
    }

    pub async fn set_customer_status(&self, id: i64, status: CustomerStatus) -> Result<()> {
        let mut state = self.state.lock().await;
        let customer = state
            .customers
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Customer {}", id)))?;
        customer.status = status;
        Ok(())
    }

    pub async fn add_tariff(&self, tariff: NewTariff) -> Result<Tariff> {
        tariff.validate()?;
        let mut state = self.state.lock().await;

        let id = next(&mut state.ids.tariffs);
        let created = Tariff {
            id,
            power_capacity: tariff.power_capacity,
            rate_per_kwh: tariff.rate_per_kwh,
            admin_fee: tariff.admin_fee,
            tax_percentage: tariff.tax_percentage,
            effective_date: tariff.effective_date,
            is_active: true,
        };
        state.tariffs.insert(id, created.clone());
        Ok(created)
    }

    /// Soft delete: the row stays, it just stops being effective
    pub async fn deactivate_tariff(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        let tariff = state
            .tariffs
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Tariff {}", id)))?;
        tariff.is_active = false;
        Ok(())
    }

    /// Make the named repository operation fail until cleared
    pub async fn inject_failure(&self, operation: &str) {
        self.state.lock().await.failures.insert(operation.to_string());
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    pub async fn readings(&self) -> Vec<MeterReading> {
        self.state.lock().await.readings.values().cloned().collect()
    }

    pub async fn bills(&self) -> Vec<Bill> {
        self.state.lock().await.bills.values().cloned().collect()
    }

    pub async fn bill(&self, id: i64) -> Option<Bill> {
        self.state.lock().await.bills.get(&id).cloned()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.lock().await.payments.values().cloned().collect()
    }

    pub async fn payment(&self, id: i64) -> Option<Payment> {
        self.state.lock().await.payments.get(&id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working: Some(working),
        }))
    }
}

/// Exclusive view of the memory store until commit, rollback or drop
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: Option<MemoryState>,
}

impl MemoryUnitOfWork {
    fn state(&mut self, operation: &str) -> Result<&mut MemoryState> {
        let state = self
            .working
            .as_mut()
            .ok_or_else(|| AppError::internal("Unit of work already finished"))?;
        state.check_failure(operation)?;
        Ok(state)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(&mut self) -> Result<()> {
        let working = self
            .working
            .take()
            .ok_or_else(|| AppError::internal("Unit of work already finished"))?;
        working.check_failure("commit")?;
        *self.guard = working;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.working = None;
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for MemoryUnitOfWork {
    async fn find_customer(&mut self, id: i64) -> Result<Option<Customer>> {
        Ok(self.state("find_customer")?.customers.get(&id).cloned())
    }
}

#[async_trait]
impl TariffRepository for MemoryUnitOfWork {
    async fn find_effective_tariff(
        &mut self,
        power_capacity: PowerCapacity,
        as_of: NaiveDate,
    ) -> Result<Option<Tariff>> {
        let state = self.state("find_effective_tariff")?;

        Ok(state
            .tariffs
            .values()
            .filter(|t| t.power_capacity == power_capacity && t.applies_on(as_of))
            .max_by_key(|t| (t.effective_date, t.id))
            .cloned())
    }
}

#[async_trait]
impl MeterReadingRepository for MemoryUnitOfWork {
    async fn find_reading(&mut self, id: i64) -> Result<Option<MeterReading>> {
        Ok(self.state("find_reading")?.readings.get(&id).cloned())
    }

    async fn find_reading_by_month(
        &mut self,
        customer_id: i64,
        month: BillingMonth,
    ) -> Result<Option<MeterReading>> {
        let state = self.state("find_reading_by_month")?;

        Ok(state
            .readings
            .values()
            .find(|r| r.customer_id == customer_id && r.reading_month == month)
            .cloned())
    }

    async fn latest_reading_before(
        &mut self,
        customer_id: i64,
        month: BillingMonth,
    ) -> Result<Option<MeterReading>> {
        let state = self.state("latest_reading_before")?;

        Ok(state
            .readings
            .values()
            .filter(|r| r.customer_id == customer_id && r.reading_month < month)
            .max_by_key(|r| r.reading_month)
            .cloned())
    }

    async fn latest_reading(&mut self, customer_id: i64) -> Result<Option<MeterReading>> {
        let state = self.state("latest_reading")?;

        Ok(state
            .readings
            .values()
            .filter(|r| r.customer_id == customer_id)
            .max_by_key(|r| r.reading_month)
            .cloned())
    }

    async fn insert_reading(&mut self, reading: &NewMeterReading) -> Result<i64> {
        let state = self.state("insert_reading")?;

        if state
            .readings
            .values()
            .any(|r| r.customer_id == reading.customer_id && r.reading_month == reading.reading_month)
        {
            return Err(AppError::DuplicateReading {
                customer_id: reading.customer_id,
                month: reading.reading_month.to_string(),
            });
        }

        let id = next(&mut state.ids.readings);
        state.readings.insert(
            id,
            MeterReading {
                id,
                customer_id: reading.customer_id,
                reading_month: reading.reading_month,
                previous_meter: reading.previous_meter,
                current_meter: reading.current_meter,
                reading_date: reading.reading_date,
                recorded_by: reading.recorded_by,
                notes: reading.notes.clone(),
                created_at: Some(Utc::now()),
            },
        );
        Ok(id)
    }

    async fn update_reading(
        &mut self,
        id: i64,
        current_meter: Decimal,
        reading_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<bool> {
        let state = self.state("update_reading")?;

        match state.readings.get_mut(&id) {
            Some(reading) => {
                reading.current_meter = current_meter;
                reading.reading_date = reading_date;
                reading.notes = notes.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_reading(&mut self, id: i64) -> Result<bool> {
        let state = self.state("delete_reading")?;
        Ok(state.readings.remove(&id).is_some())
    }
}

#[async_trait]
impl BillRepository for MemoryUnitOfWork {
    async fn find_bill(&mut self, id: i64) -> Result<Option<Bill>> {
        Ok(self.state("find_bill")?.bills.get(&id).cloned())
    }

    async fn find_bill_for_reading(&mut self, meter_reading_id: i64) -> Result<Option<Bill>> {
        let state = self.state("find_bill_for_reading")?;

        Ok(state
            .bills
            .values()
            .find(|b| b.meter_reading_id == meter_reading_id)
            .cloned())
    }

    async fn bill_number_exists(&mut self, bill_number: &str) -> Result<bool> {
        let state = self.state("bill_number_exists")?;
        Ok(state.bills.values().any(|b| b.bill_number == bill_number))
    }

    async fn insert_bill(&mut self, bill: &NewBill) -> Result<i64> {
        let state = self.state("insert_bill")?;

        if state
            .bills
            .values()
            .any(|b| b.meter_reading_id == bill.meter_reading_id)
        {
            return Err(AppError::BillAlreadyExists(bill.meter_reading_id));
        }
        if state.bills.values().any(|b| b.bill_number == bill.bill_number) {
            return Err(AppError::Conflict(format!(
                "Bill number {} is already in use",
                bill.bill_number
            )));
        }

        let id = next(&mut state.ids.bills);
        state.bills.insert(
            id,
            Bill {
                id,
                bill_number: bill.bill_number.clone(),
                customer_id: bill.customer_id,
                meter_reading_id: bill.meter_reading_id,
                bill_month: bill.bill_month,
                usage_kwh: bill.usage_kwh,
                rate_per_kwh: bill.rate_per_kwh,
                electricity_charge: bill.electricity_charge,
                admin_fee: bill.admin_fee,
                tax_percentage: bill.tax_percentage,
                tax_amount: bill.tax_amount,
                total_amount: bill.total_amount,
                due_date: bill.due_date,
                status: BillStatus::Unpaid,
                created_at: Some(Utc::now()),
            },
        );
        Ok(id)
    }

    async fn update_bill_status(&mut self, id: i64, status: BillStatus) -> Result<bool> {
        let state = self.state("update_bill_status")?;

        match state.bills.get_mut(&id) {
            Some(bill) => {
                bill.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_bill(&mut self, id: i64) -> Result<bool> {
        let state = self.state("delete_bill")?;
        Ok(state.bills.remove(&id).is_some())
    }

    async fn unbilled_readings(&mut self, month: BillingMonth) -> Result<Vec<BillingCandidate>> {
        let state = self.state("unbilled_readings")?;

        let billed: HashSet<i64> = state.bills.values().map(|b| b.meter_reading_id).collect();
        Ok(state
            .readings
            .values()
            .filter(|r| r.reading_month == month && !billed.contains(&r.id))
            .filter_map(|r| {
                state
                    .customers
                    .get(&r.customer_id)
                    .filter(|c| c.is_active())
                    .map(|c| BillingCandidate {
                        meter_reading_id: r.id,
                        customer_id: c.id,
                        customer_name: c.full_name.clone(),
                    })
            })
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for MemoryUnitOfWork {
    async fn find_payment(&mut self, id: i64) -> Result<Option<Payment>> {
        Ok(self.state("find_payment")?.payments.get(&id).cloned())
    }

    async fn payments_for_bill(&mut self, bill_id: i64) -> Result<Vec<Payment>> {
        let state = self.state("payments_for_bill")?;

        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.bill_id == bill_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| (b.payment_date, b.id).cmp(&(a.payment_date, a.id)));
        Ok(payments)
    }

    async fn count_payments_for_bill(&mut self, bill_id: i64) -> Result<i64> {
        let state = self.state("count_payments_for_bill")?;
        Ok(state.payments.values().filter(|p| p.bill_id == bill_id).count() as i64)
    }

    async fn payment_number_exists(&mut self, payment_number: &str) -> Result<bool> {
        let state = self.state("payment_number_exists")?;
        Ok(state
            .payments
            .values()
            .any(|p| p.payment_number == payment_number))
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<i64> {
        let state = self.state("insert_payment")?;

        if state
            .payments
            .values()
            .any(|p| p.payment_number == payment.payment_number)
        {
            return Err(AppError::Conflict(format!(
                "Payment number {} is already in use",
                payment.payment_number
            )));
        }

        let id = next(&mut state.ids.payments);
        state.payments.insert(
            id,
            Payment {
                id,
                bill_id: payment.bill_id,
                payment_number: payment.payment_number.clone(),
                payment_method: payment.payment_method,
                amount: payment.amount,
                payment_date: payment.payment_date,
                status: PaymentStatus::Pending,
                notes: payment.notes.clone(),
                verified_by: None,
                verification_date: None,
            },
        );
        Ok(id)
    }

    async fn record_decision(&mut self, id: i64, decision: &PaymentDecision) -> Result<bool> {
        let state = self.state("record_decision")?;

        match state.payments.get_mut(&id) {
            Some(payment) if payment.status == PaymentStatus::Pending => {
                payment.status = decision.status;
                payment.verified_by = Some(decision.verified_by);
                payment.verification_date = Some(decision.verification_date);
                payment.notes = decision.notes.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn payment_statistics(&mut self, month: Option<BillingMonth>) -> Result<PaymentStatistics> {
        let state = self.state("payment_statistics")?;

        let mut stats = PaymentStatistics::default();
        let in_month = |p: &&Payment| match month {
            Some(m) => BillingMonth::of(to_jakarta(p.payment_date).date_naive()) == m,
            None => true,
        };

        for payment in state.payments.values().filter(in_month) {
            match payment.status {
                PaymentStatus::Verified => {
                    stats.verified.count += 1;
                    stats.verified.total_amount += payment.amount;
                }
                PaymentStatus::Pending => {
                    stats.pending.count += 1;
                    stats.pending.total_amount += payment.amount;
                }
                PaymentStatus::Rejected => stats.rejected.count += 1,
            }
        }

        Ok(stats)
    }
}
