// Integration tests for single bill generation and bill maintenance
//
// Covers tariff resolution, charge snapshots, due dates, the one-bill-per-reading
// rule under concurrency, derived overdue status and delete guards.

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use helpers::{admin, TestApp};
use voltbill::bills::{BillStatus, DisplayStatus, ReadingSelector};
use voltbill::core::{Caller, ErrorKind};
use voltbill::modules::customers::models::PowerCapacity;
use voltbill::modules::tariffs::{Tariff, TariffResolver};
use voltbill::payments::models::SubmitPaymentRequest;
use voltbill::payments::PaymentMethod;
use voltbill::store::{Store, UnitOfWork};

#[tokio::test]
async fn test_generate_by_reading_id() {
    let app = TestApp::new();
    let tariff = app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, None).await;
    app.record(customer.id, "2024-02", dec!(1200)).await;
    let reading = app.record(customer.id, "2024-03", dec!(1300)).await;

    let generated = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();

    assert_eq!(generated.total_amount, dec!(161340));
    assert!(generated.bill_number.starts_with("INV-202403-"));

    let bill = app.store.bill(generated.id).await.unwrap();
    assert_eq!(bill.customer_id, customer.id);
    assert_eq!(bill.meter_reading_id, reading.id);
    assert_eq!(bill.bill_month.to_string(), "2024-03");
    assert_eq!(bill.usage_kwh, dec!(100));
    assert_eq!(bill.rate_per_kwh, tariff.rate_per_kwh);
    assert_eq!(bill.electricity_charge, dec!(144400));
    assert_eq!(bill.admin_fee, dec!(2500));
    assert_eq!(bill.tax_percentage, dec!(10));
    assert_eq!(bill.tax_amount, dec!(14440));
    assert_eq!(bill.total_amount, dec!(161340));
    assert_eq!(bill.status, BillStatus::Unpaid);
    assert_eq!(bill.due_date, NaiveDate::from_ymd_opt(2024, 4, 17).unwrap());
}

#[tokio::test]
async fn test_generate_by_customer_and_month() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(50)).await;

    let generated = app
        .services
        .generator
        .generate(ReadingSelector::ByCustomerMonth {
            customer_id: customer.id,
            bill_month: "2024-03".parse().unwrap(),
        })
        .await
        .unwrap();

    let bill = app.store.bill(generated.id).await.unwrap();
    assert_eq!(bill.meter_reading_id, reading.id);

    let err = app
        .services
        .generator
        .generate(ReadingSelector::ByCustomerMonth {
            customer_id: customer.id,
            bill_month: "2024-02".parse().unwrap(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadingNotFound);
}

#[tokio::test]
async fn test_second_generation_is_rejected() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;

    app.services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();
    let err = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BillAlreadyExists);
    assert_eq!(app.store.bills().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_generation_creates_one_bill() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;

    let first = app.services.generator.clone();
    let second = app.services.generator.clone();
    let (a, b) = tokio::join!(
        first.generate(ReadingSelector::ById(reading.id)),
        second.generate(ReadingSelector::ById(reading.id)),
    );
    let results = [a, b];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(failure.kind(), ErrorKind::BillAlreadyExists);
    assert_eq!(app.store.bills().await.len(), 1);
}

#[tokio::test]
async fn test_missing_reading() {
    let app = TestApp::new();

    let err = app
        .services
        .generator
        .generate(ReadingSelector::ById(404))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReadingNotFound);
}

#[tokio::test]
async fn test_missing_tariff_persists_nothing() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va2200, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;

    let err = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TariffNotFound);
    assert!(app.store.bills().await.is_empty());
}

#[tokio::test]
async fn test_future_and_inactive_tariffs_are_ignored() {
    let app = TestApp::new();
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;

    // Effective tomorrow in Jakarta
    app.tariff(PowerCapacity::Va900, dec!(1500), dec!(0), dec!(0), "2024-03-29")
        .await;
    let retired = app
        .tariff(PowerCapacity::Va900, dec!(1400), dec!(0), dec!(0), "2024-03-01")
        .await;
    app.store.deactivate_tariff(retired.id).await.unwrap();

    let err = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TariffNotFound);

    app.tariff(PowerCapacity::Va900, dec!(1300), dec!(0), dec!(0), "2023-06-01")
        .await;
    let generated = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();
    assert_eq!(generated.total_amount, dec!(130000));
}

async fn resolve(
    app: &TestApp,
    power_capacity: PowerCapacity,
    as_of: NaiveDate,
) -> voltbill::core::Result<Tariff> {
    let mut uow = app.services.store.begin().await.unwrap();
    let result = TariffResolver::resolve(uow.as_mut(), power_capacity, as_of).await;
    uow.rollback().await.unwrap();
    result
}

#[tokio::test]
async fn test_tariff_resolution_prefers_latest_then_highest_id() {
    let app = TestApp::new();
    let as_of = NaiveDate::from_ymd_opt(2024, 3, 28).unwrap();

    app.tariff(PowerCapacity::Va1300, dec!(1400), dec!(0), dec!(0), "2023-01-01")
        .await;
    let newer = app
        .tariff(PowerCapacity::Va1300, dec!(1444.70), dec!(0), dec!(0), "2024-01-01")
        .await;
    assert_eq!(
        resolve(&app, PowerCapacity::Va1300, as_of).await.unwrap().id,
        newer.id
    );

    let same_day = app
        .tariff(PowerCapacity::Va1300, dec!(1450), dec!(0), dec!(0), "2024-01-01")
        .await;
    assert_eq!(
        resolve(&app, PowerCapacity::Va1300, as_of).await.unwrap().id,
        same_day.id
    );

    let err = resolve(&app, PowerCapacity::Va5500, as_of)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TariffNotFound);
}

#[tokio::test]
async fn test_bill_keeps_charges_after_tariff_change() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;

    let generated = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();
    app.tariff(PowerCapacity::Va900, dec!(2000), dec!(5000), dec!(11), "2024-03-15")
        .await;

    let bill = app.store.bill(generated.id).await.unwrap();
    assert_eq!(bill.rate_per_kwh, dec!(1444));
    assert_eq!(bill.total_amount, dec!(161340));
}

#[tokio::test]
async fn test_fractional_charges_are_rounded() {
    let app = TestApp::new();
    app.tariff(PowerCapacity::Va1300, dec!(1444.70), dec!(2500), dec!(10), "2024-01-01")
        .await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va1300, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(12.35)).await;

    let generated = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();

    let bill = app.store.bill(generated.id).await.unwrap();
    assert_eq!(bill.electricity_charge, dec!(17842.05));
    assert_eq!(bill.tax_amount, dec!(1784.20));
    assert_eq!(bill.total_amount, dec!(22126.25));
}

#[tokio::test]
async fn test_bill_detail_and_display_status() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, Some(100)).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;
    let generated = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();

    let detail = app
        .services
        .bills
        .bill_detail(&Caller::customer(100), generated.id)
        .await
        .unwrap();
    assert_eq!(detail.display_status, DisplayStatus::Unpaid);
    assert!(detail.payments.is_empty());

    let err = app
        .services
        .bills
        .bill_detail(&Caller::customer(101), generated.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForbiddenBillAccess);

    // Due 2024-04-17: still unpaid on the due date, overdue the day after
    let on_due_date = app.later(Utc.with_ymd_and_hms(2024, 4, 17, 10, 0, 0).unwrap());
    let detail = on_due_date
        .bills
        .bill_detail(&admin(), generated.id)
        .await
        .unwrap();
    assert_eq!(detail.display_status, DisplayStatus::Unpaid);

    let after_due_date = app.later(Utc.with_ymd_and_hms(2024, 4, 18, 1, 0, 0).unwrap());
    let detail = after_due_date
        .bills
        .bill_detail(&admin(), generated.id)
        .await
        .unwrap();
    assert_eq!(detail.display_status, DisplayStatus::Overdue);
    assert_eq!(detail.bill.status, BillStatus::Unpaid);

    let err = app.services.bills.bill_detail(&admin(), 999).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillNotFound);
}

#[tokio::test]
async fn test_update_bill_status() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, None).await;
    let reading = app.record(customer.id, "2024-03", dec!(100)).await;
    let generated = app
        .services
        .generator
        .generate(ReadingSelector::ById(reading.id))
        .await
        .unwrap();

    let updated = app
        .services
        .bills
        .update_bill_status(generated.id, "paid")
        .await
        .unwrap();
    assert_eq!(updated.status, BillStatus::Paid);
    assert_eq!(app.store.bill(generated.id).await.unwrap().status, BillStatus::Paid);

    for invalid in ["overdue", "cancelled"] {
        let err = app
            .services
            .bills
            .update_bill_status(generated.id, invalid)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    let err = app
        .services
        .bills
        .update_bill_status(999, "unpaid")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillNotFound);
}

#[tokio::test]
async fn test_delete_bill() {
    let app = TestApp::new();
    app.household_tariff().await;
    let customer = app.customer("PLG-0001", PowerCapacity::Va900, Some(100)).await;
    let march = app.record(customer.id, "2024-03", dec!(100)).await;
    let april = app.record(customer.id, "2024-04", dec!(150)).await;

    let with_payment = app
        .services
        .generator
        .generate(ReadingSelector::ById(march.id))
        .await
        .unwrap();
    let without_payment = app
        .services
        .generator
        .generate(ReadingSelector::ById(april.id))
        .await
        .unwrap();

    app.services
        .payments
        .submit(
            &Caller::customer(100),
            SubmitPaymentRequest {
                bill_id: with_payment.id,
                payment_method: PaymentMethod::Transfer,
                amount: with_payment.total_amount,
                notes: None,
            },
        )
        .await
        .unwrap();

    let err = app
        .services
        .bills
        .delete_bill(with_payment.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillHasPayments);

    app.services.bills.delete_bill(without_payment.id).await.unwrap();
    assert!(app.store.bill(without_payment.id).await.is_none());

    // Without its bill the reading can be deleted
    app.services.readings.delete_reading(april.id).await.unwrap();
}
