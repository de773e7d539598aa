use std::str::FromStr;
use std::sync::Arc;

use crate::core::{AppError, Caller, Clock, Result};
use crate::modules::bills::models::{derive_display_status, Bill, BillDetail, BillStatus};
use crate::modules::bills::repositories::BillRepository;
use crate::modules::customers::repositories::CustomerRepository;
use crate::modules::payments::repositories::PaymentRepository;
use crate::store::{finish, Store, UnitOfWork};

/// Bill lookups and admin maintenance
pub struct BillService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl BillService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Bill with its payments; customers only see their own bills
    pub async fn bill_detail(&self, caller: &Caller, bill_id: i64) -> Result<BillDetail> {
        let mut uow = self.store.begin().await?;
        let result = self.detail_in(uow.as_mut(), caller, bill_id).await;
        finish(uow, result).await
    }

    async fn detail_in(
        &self,
        uow: &mut dyn UnitOfWork,
        caller: &Caller,
        bill_id: i64,
    ) -> Result<BillDetail> {
        let bill = uow
            .find_bill(bill_id)
            .await?
            .ok_or(AppError::BillNotFound(bill_id))?;

        if !caller.is_admin() {
            let owned = uow
                .find_customer(bill.customer_id)
                .await?
                .map(|customer| customer.is_owned_by(caller.user_id))
                .unwrap_or(false);
            if !owned {
                return Err(AppError::ForbiddenBillAccess(bill_id));
            }
        }

        let payments = uow.payments_for_bill(bill_id).await?;
        let display_status = derive_display_status(&bill, self.clock.today());

        Ok(BillDetail {
            bill,
            display_status,
            payments,
        })
    }

    /// Manual status override. Only `unpaid` and `paid` can be stored.
    pub async fn update_bill_status(&self, bill_id: i64, status: &str) -> Result<Bill> {
        let status = BillStatus::from_str(status.trim())?;

        let mut uow = self.store.begin().await?;
        let result = Self::update_status_in(uow.as_mut(), bill_id, status).await;
        finish(uow, result).await
    }

    async fn update_status_in(
        uow: &mut dyn UnitOfWork,
        bill_id: i64,
        status: BillStatus,
    ) -> Result<Bill> {
        let mut bill = uow
            .find_bill(bill_id)
            .await?
            .ok_or(AppError::BillNotFound(bill_id))?;

        if !uow.update_bill_status(bill_id, status).await? {
            return Err(AppError::BillNotFound(bill_id));
        }

        tracing::info!(bill_id, from = %bill.status, to = %status, "Bill status updated");
        bill.status = status;
        Ok(bill)
    }

    /// Delete a bill that has no payments
    pub async fn delete_bill(&self, bill_id: i64) -> Result<()> {
        let mut uow = self.store.begin().await?;
        let result = Self::delete_in(uow.as_mut(), bill_id).await;
        finish(uow, result).await
    }

    async fn delete_in(uow: &mut dyn UnitOfWork, bill_id: i64) -> Result<()> {
        uow.find_bill(bill_id)
            .await?
            .ok_or(AppError::BillNotFound(bill_id))?;

        if uow.count_payments_for_bill(bill_id).await? > 0 {
            return Err(AppError::BillHasPayments(bill_id));
        }

        if !uow.delete_bill(bill_id).await? {
            return Err(AppError::BillNotFound(bill_id));
        }

        tracing::info!(bill_id, "Bill deleted");
        Ok(())
    }
}
