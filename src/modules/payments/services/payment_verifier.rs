use std::sync::Arc;

use crate::config::BillingConfig;
use crate::core::identifiers::random_payment_number;
use crate::core::money::amounts_equal;
use crate::core::{AppError, BillingMonth, Caller, Clock, Result};
use crate::modules::bills::models::BillStatus;
use crate::modules::payments::models::{
    Decision, DecisionOutcome, NewPayment, PaymentDecision, PaymentStatistics, PaymentStatus,
    SubmitPaymentRequest, SubmittedPayment,
};
use crate::modules::bills::repositories::BillRepository;
use crate::modules::customers::repositories::CustomerRepository;
use crate::modules::payments::repositories::PaymentRepository;
use crate::store::{finish, Store, UnitOfWork};

/// Payment submission and the admin decision state machine
///
/// `pending -> verified | rejected`, both terminal. Verification flips the bill
/// to `paid` in the same unit of work.
pub struct PaymentVerifier {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: BillingConfig,
}

impl PaymentVerifier {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: BillingConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Submit a payment for a bill; the amount must equal the bill total exactly
    pub async fn submit(
        &self,
        caller: &Caller,
        request: SubmitPaymentRequest,
    ) -> Result<SubmittedPayment> {
        request.validate()?;

        let mut uow = self.store.begin().await?;
        let result = self.submit_in(uow.as_mut(), caller, request).await;
        finish(uow, result).await
    }

    async fn submit_in(
        &self,
        uow: &mut dyn UnitOfWork,
        caller: &Caller,
        request: SubmitPaymentRequest,
    ) -> Result<SubmittedPayment> {
        let bill = uow
            .find_bill(request.bill_id)
            .await?
            .ok_or(AppError::BillNotFound(request.bill_id))?;

        if !caller.is_admin() {
            let owned = uow
                .find_customer(bill.customer_id)
                .await?
                .map(|customer| customer.is_owned_by(caller.user_id))
                .unwrap_or(false);
            if !owned {
                tracing::warn!(bill_id = bill.id, user_id = caller.user_id, "Payment for foreign bill");
                return Err(AppError::ForbiddenBillAccess(bill.id));
            }
        }

        if bill.is_paid() {
            return Err(AppError::BillAlreadyPaid(bill.id));
        }

        if !amounts_equal(request.amount, bill.total_amount) {
            tracing::warn!(
                bill_id = bill.id,
                expected = %bill.total_amount,
                actual = %request.amount,
                "Payment amount mismatch"
            );
            return Err(AppError::AmountMismatch {
                expected: bill.total_amount,
                actual: request.amount,
            });
        }

        let payment_date = self.clock.now();
        let payment_number = self.unique_payment_number(uow).await?;

        let payment = NewPayment {
            bill_id: bill.id,
            payment_number,
            payment_method: request.payment_method,
            amount: request.amount,
            payment_date,
            notes: request.notes,
        };
        let id = uow.insert_payment(&payment).await?;

        tracing::info!(
            payment_id = id,
            payment_number = %payment.payment_number,
            bill_id = bill.id,
            method = %payment.payment_method,
            "Payment submitted"
        );

        Ok(SubmittedPayment {
            id,
            payment_number: payment.payment_number,
        })
    }

    async fn unique_payment_number(&self, uow: &mut dyn UnitOfWork) -> Result<String> {
        for attempt in 1..=self.config.number_generation_attempts {
            let candidate =
                random_payment_number(&self.config.payment_number_prefix, self.clock.now());
            if !uow.payment_number_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(attempt, candidate = %candidate, "Payment number collision");
        }

        Err(AppError::Conflict(format!(
            "Could not allocate a unique payment number after {} attempts",
            self.config.number_generation_attempts
        )))
    }

    /// Decide a pending payment as `verified` or `rejected`
    ///
    /// Previous notes are kept when `notes` is `None`.
    pub async fn decide(
        &self,
        caller: &Caller,
        payment_id: i64,
        decision: &str,
        notes: Option<String>,
    ) -> Result<DecisionOutcome> {
        let decision = Decision::parse(decision)?;

        let mut uow = self.store.begin().await?;
        let result = self
            .decide_in(uow.as_mut(), caller, payment_id, decision, notes)
            .await;
        finish(uow, result).await
    }

    async fn decide_in(
        &self,
        uow: &mut dyn UnitOfWork,
        caller: &Caller,
        payment_id: i64,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<DecisionOutcome> {
        let payment = uow
            .find_payment(payment_id)
            .await?
            .ok_or(AppError::PaymentNotFound(payment_id))?;

        if payment.status.is_decided() {
            return Err(AppError::PaymentAlreadyDecided {
                id: payment_id,
                status: payment.status.to_string(),
            });
        }

        if decision == Decision::Verified {
            let bill = uow
                .find_bill(payment.bill_id)
                .await?
                .ok_or(AppError::BillNotFound(payment.bill_id))?;
            if bill.is_paid() {
                return Err(AppError::BillAlreadyPaid(bill.id));
            }

            // A manual status override can reopen a bill; its verified payment still counts
            let already_verified = uow
                .payments_for_bill(bill.id)
                .await?
                .iter()
                .any(|other| other.status == PaymentStatus::Verified);
            if already_verified {
                tracing::warn!(payment_id, bill_id = bill.id, "Bill already has a verified payment");
                return Err(AppError::BillAlreadyPaid(bill.id));
            }
        }

        let record = PaymentDecision {
            status: decision.status(),
            verified_by: caller.user_id,
            verification_date: self.clock.now(),
            notes: notes.or(payment.notes),
        };
        if !uow.record_decision(payment_id, &record).await? {
            return Err(AppError::PaymentAlreadyDecided {
                id: payment_id,
                status: "decided".to_string(),
            });
        }

        let bill_paid = decision == Decision::Verified;
        if bill_paid
            && !uow
                .update_bill_status(payment.bill_id, BillStatus::Paid)
                .await?
        {
            return Err(AppError::BillNotFound(payment.bill_id));
        }

        tracing::info!(
            payment_id,
            bill_id = payment.bill_id,
            status = %record.status,
            decided_by = caller.user_id,
            "Payment decided"
        );

        Ok(DecisionOutcome {
            payment_id,
            bill_id: payment.bill_id,
            status: record.status,
            bill_paid,
        })
    }

    /// Payment counts and totals per status, for one local month or overall
    pub async fn statistics(&self, month: Option<BillingMonth>) -> Result<PaymentStatistics> {
        let mut uow = self.store.begin().await?;
        let result = uow.payment_statistics(month).await;
        finish(uow, result).await
    }
}
