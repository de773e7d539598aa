// Integration tests for payment submission and verification
//
// pending -> verified | rejected, both terminal. Verifying flips the bill to
// paid in the same unit of work; a failure in between leaves both untouched.

#[path = "../helpers/mod.rs"]
mod helpers;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use helpers::{admin, TestApp, ADMIN_ID};
use voltbill::bills::{BillStatus, ReadingSelector};
use voltbill::core::{Caller, ErrorKind};
use voltbill::modules::customers::models::PowerCapacity;
use voltbill::payments::models::{SubmitPaymentRequest, SubmittedPayment};
use voltbill::payments::{PaymentMethod, PaymentStatus};

const OWNER: i64 = 100;

fn owner() -> Caller {
    Caller::customer(OWNER)
}

/// One customer owned by user 100 with a 161,340 bill for 2024-03
async fn billed_app() -> (TestApp, i64) {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, Some(OWNER)).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;
    let bill = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();
    (app, bill.id)
}

fn payment(bill_id: i64, amount: Decimal) -> SubmitPaymentRequest {
    SubmitPaymentRequest {
        bill_id,
        payment_method: PaymentMethod::Transfer,
        amount,
        notes: Some("BCA transfer".to_string()),
    }
}

async fn submit(app: &TestApp, bill_id: i64) -> SubmittedPayment {
    app.services
        .payments
        .submit(&owner(), payment(bill_id, dec!(161340.00)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_submit_and_verify_marks_bill_paid() {
    let (app, bill_id) = billed_app().await;

    let submitted = submit(&app, bill_id).await;
    assert!(submitted.payment_number.starts_with("PAY-20240328030000-"));

    let stored = app.store.payment(submitted.id).await.unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(stored.amount, dec!(161340));
    assert_eq!(app.store.bill(bill_id).await.unwrap().status, BillStatus::Unpaid);

    let outcome = app
        .services
        .payments
        .decide(&admin(), submitted.id, "verified", Some("Matched bank statement".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.status, PaymentStatus::Verified);
    assert!(outcome.bill_paid);
    assert_eq!(outcome.bill_id, bill_id);

    let stored = app.store.payment(submitted.id).await.unwrap();
    assert_eq!(stored.status, PaymentStatus::Verified);
    assert_eq!(stored.verified_by, Some(ADMIN_ID));
    assert!(stored.verification_date.is_some());
    assert_eq!(stored.notes.as_deref(), Some("Matched bank statement"));
    assert_eq!(app.store.bill(bill_id).await.unwrap().status, BillStatus::Paid);
}

#[tokio::test]
async fn test_decision_is_final() {
    let (app, bill_id) = billed_app().await;
    let submitted = submit(&app, bill_id).await;

    app.services
        .payments
        .decide(&admin(), submitted.id, "verified", None)
        .await
        .unwrap();

    for decision in ["verified", "rejected"] {
        let err = app
            .services
            .payments
            .decide(&admin(), submitted.id, decision, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentAlreadyDecided);
    }
}

#[tokio::test]
async fn test_reject_keeps_bill_unpaid() {
    let (app, bill_id) = billed_app().await;
    let submitted = submit(&app, bill_id).await;

    let outcome = app
        .services
        .payments
        .decide(&admin(), submitted.id, "rejected", None)
        .await
        .unwrap();

    assert_eq!(outcome.status, PaymentStatus::Rejected);
    assert!(!outcome.bill_paid);
    assert_eq!(app.store.bill(bill_id).await.unwrap().status, BillStatus::Unpaid);

    // Notes from submission are kept when the decision has none
    let stored = app.store.payment(submitted.id).await.unwrap();
    assert_eq!(stored.notes.as_deref(), Some("BCA transfer"));

    // The customer can pay again after a rejection
    submit(&app, bill_id).await;
    assert_eq!(app.store.payments().await.len(), 2);
}

#[tokio::test]
async fn test_amount_must_match_exactly() {
    let (app, bill_id) = billed_app().await;

    for amount in [dec!(161339.99), dec!(161340.01), dec!(100000), dec!(0)] {
        let err = app
            .services
            .payments
            .submit(&owner(), payment(bill_id, amount))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmountMismatch);
    }

    for amount in [dec!(-161340), dec!(161340.001)] {
        let err = app
            .services
            .payments
            .submit(&owner(), payment(bill_id, amount))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    assert!(app.store.payments().await.is_empty());
}

#[tokio::test]
async fn test_zero_total_bill_is_settled_by_zero_payment() {
    let app = TestApp::new();
    app.tariff(PowerCapacity::Va1300, dec!(1444.70), dec!(0), dec!(0), "2024-01-01")
        .await;
    let customer = app.customer("PLG-0009", PowerCapacity::Va1300, Some(OWNER)).await;
    let reading = app.record(customer.id, "2024-03", dec!(0)).await;
    let bill = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();
    assert!(bill.total_amount.is_zero());

    let err = app
        .services
        .payments
        .submit(&owner(), payment(bill.id, dec!(0.01)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmountMismatch);

    let submitted = app
        .services
        .payments
        .submit(&owner(), payment(bill.id, dec!(0)))
        .await
        .unwrap();
    app.services
        .payments
        .decide(&admin(), submitted.id, "verified", None)
        .await
        .unwrap();
    assert_eq!(app.store.bill(bill.id).await.unwrap().status, BillStatus::Paid);
}

#[tokio::test]
async fn test_customers_can_only_pay_their_own_bills() {
    let (app, bill_id) = billed_app().await;

    let err = app
        .services
        .payments
        .submit(&Caller::customer(101), payment(bill_id, dec!(161340)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForbiddenBillAccess);

    // Admins may record a payment on behalf of a customer
    app.services
        .payments
        .submit(&admin(), payment(bill_id, dec!(161340)))
        .await
        .unwrap();

    let err = app
        .services
        .payments
        .submit(&owner(), payment(999, dec!(161340)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillNotFound);
}

#[tokio::test]
async fn test_paid_bill_rejects_new_payments() {
    let (app, bill_id) = billed_app().await;
    let first = submit(&app, bill_id).await;
    let second = submit(&app, bill_id).await;

    app.services
        .payments
        .decide(&admin(), first.id, "verified", None)
        .await
        .unwrap();

    let err = app
        .services
        .payments
        .submit(&owner(), payment(bill_id, dec!(161340)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillAlreadyPaid);

    // A second pending payment cannot verify an already paid bill
    let err = app
        .services
        .payments
        .decide(&admin(), second.id, "verified", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillAlreadyPaid);
    assert_eq!(
        app.store.payment(second.id).await.unwrap().status,
        PaymentStatus::Pending
    );

    // but it can still be rejected
    app.services
        .payments
        .decide(&admin(), second.id, "rejected", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reopened_bill_cannot_take_a_second_verified_payment() {
    let (app, bill_id) = billed_app().await;
    let first = submit(&app, bill_id).await;
    app.services
        .payments
        .decide(&admin(), first.id, "verified", None)
        .await
        .unwrap();

    app.services
        .bills
        .update_bill_status(bill_id, "unpaid")
        .await
        .unwrap();
    let second = submit(&app, bill_id).await;

    let err = app
        .services
        .payments
        .decide(&admin(), second.id, "verified", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillAlreadyPaid);

    let verified = app
        .store
        .payments()
        .await
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Verified)
        .count();
    assert_eq!(verified, 1);
    assert_eq!(
        app.store.payment(second.id).await.unwrap().status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn test_invalid_decision_and_missing_payment() {
    let (app, bill_id) = billed_app().await;
    let submitted = submit(&app, bill_id).await;

    for decision in ["approved", "pending", ""] {
        let err = app
            .services
            .payments
            .decide(&admin(), submitted.id, decision, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDecision);
    }

    let err = app
        .services
        .payments
        .decide(&admin(), 999, "verified", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentNotFound);

    assert_eq!(
        app.store.payment(submitted.id).await.unwrap().status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn test_failed_bill_update_rolls_back_decision() {
    let (app, bill_id) = billed_app().await;
    let submitted = submit(&app, bill_id).await;

    app.store.inject_failure("update_bill_status").await;
    let err = app
        .services
        .payments
        .decide(&admin(), submitted.id, "verified", None)
        .await
        .unwrap_err();
    app.store.clear_failures().await;

    assert_eq!(err.kind(), ErrorKind::Internal);
    let stored = app.store.payment(submitted.id).await.unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert!(stored.verified_by.is_none());
    assert_eq!(app.store.bill(bill_id).await.unwrap().status, BillStatus::Unpaid);

    // Retrying once the store recovers succeeds
    app.services
        .payments
        .decide(&admin(), submitted.id, "verified", None)
        .await
        .unwrap();
    assert_eq!(app.store.bill(bill_id).await.unwrap().status, BillStatus::Paid);
}

#[tokio::test]
async fn test_payment_statistics() {
    let (app, bill_id) = billed_app().await;
    let rejected = submit(&app, bill_id).await;
    app.services
        .payments
        .decide(&admin(), rejected.id, "rejected", None)
        .await
        .unwrap();
    let pending = submit(&app, bill_id).await;
    let verified = submit(&app, bill_id).await;
    app.services
        .payments
        .decide(&admin(), verified.id, "verified", None)
        .await
        .unwrap();
    assert_ne!(pending.id, verified.id);

    let stats = app.services.payments.statistics(None).await.unwrap();
    assert_eq!(stats.verified.count, 1);
    assert_eq!(stats.verified.total_amount, dec!(161340));
    assert_eq!(stats.pending.count, 1);
    assert_eq!(stats.pending.total_amount, dec!(161340));
    assert_eq!(stats.rejected.count, 1);

    let march = app
        .services
        .payments
        .statistics(Some("2024-03".parse().unwrap()))
        .await
        .unwrap();
    assert_eq!(march, stats);

    let april = app
        .services
        .payments
        .statistics(Some("2024-04".parse().unwrap()))
        .await
        .unwrap();
    assert_eq!(april.verified.count, 0);
    assert_eq!(april.pending.count, 0);
    assert_eq!(april.rejected.count, 0);
}
