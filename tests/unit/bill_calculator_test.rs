// Property-based tests for the bill charge formula
//
// electricity_charge = usage × rate, tax = charge × tax% / 100,
// total = charge + admin_fee + tax, every component rounded to 2 places.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use voltbill::bills::services::BillCalculator;
use voltbill::modules::customers::models::PowerCapacity;
use voltbill::modules::tariffs::models::Tariff;

fn tariff(rate: Decimal, admin_fee: Decimal, tax_percentage: Decimal) -> Tariff {
    Tariff {
        id: 1,
        power_capacity: PowerCapacity::Va1300,
        rate_per_kwh: rate,
        admin_fee,
        tax_percentage,
        effective_date: "2024-01-01".parse().unwrap(),
        is_active: true,
    }
}

/// Usage in hundredths of a kWh, up to 100,000 kWh
fn usage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Rate in hundredths of a Rupiah, 1.00 to 5,000.00
fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (100i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

#[test]
fn test_household_bill_scenario() {
    // 100 kWh at 1444/kWh, admin 2500, tax 10%
    let charges = BillCalculator::new().calculate(dec!(100), &tariff(dec!(1444), dec!(2500), dec!(10)));

    assert_eq!(charges.electricity_charge, dec!(144400));
    assert_eq!(charges.admin_fee, dec!(2500));
    assert_eq!(charges.tax_amount, dec!(14440));
    assert_eq!(charges.total_amount, dec!(161340));
}

proptest! {
    #[test]
    fn test_calculation_is_deterministic(
        usage in usage_strategy(),
        rate in rate_strategy(),
        tax in 0u8..=100u8,
    ) {
        let tariff = tariff(rate, dec!(2500), Decimal::from(tax));
        let calculator = BillCalculator::new();

        prop_assert_eq!(calculator.calculate(usage, &tariff), calculator.calculate(usage, &tariff));
    }

    #[test]
    fn test_total_is_sum_of_components(
        usage in usage_strategy(),
        rate in rate_strategy(),
        admin_fee in 0i64..1_000_000i64,
        tax in 0u8..=100u8,
    ) {
        let tariff = tariff(rate, Decimal::new(admin_fee, 2), Decimal::from(tax));
        let charges = BillCalculator::new().calculate(usage, &tariff);

        prop_assert_eq!(
            charges.total_amount,
            charges.electricity_charge + charges.admin_fee + charges.tax_amount
        );
    }

    #[test]
    fn test_components_have_at_most_two_decimals(
        usage in usage_strategy(),
        rate in rate_strategy(),
        tax in 0u8..=100u8,
    ) {
        let charges = BillCalculator::new().calculate(usage, &tariff(rate, dec!(0), Decimal::from(tax)));

        prop_assert!(charges.electricity_charge.normalize().scale() <= 2);
        prop_assert!(charges.tax_amount.normalize().scale() <= 2);
        prop_assert!(charges.total_amount.normalize().scale() <= 2);
    }

    #[test]
    fn test_charge_is_within_half_cent_of_exact_product(
        usage in usage_strategy(),
        rate in rate_strategy(),
    ) {
        let charges = BillCalculator::new().calculate(usage, &tariff(rate, dec!(0), dec!(0)));
        let exact = usage * rate;

        prop_assert!((charges.electricity_charge - exact).abs() <= dec!(0.005));
    }

    #[test]
    fn test_zero_tax_rate_produces_zero_tax(
        usage in usage_strategy(),
        rate in rate_strategy(),
    ) {
        let charges = BillCalculator::new().calculate(usage, &tariff(rate, dec!(2500), dec!(0)));

        prop_assert_eq!(charges.tax_amount, Decimal::ZERO);
        prop_assert_eq!(charges.total_amount, charges.electricity_charge + dec!(2500));
    }

    #[test]
    fn test_more_usage_never_costs_less(
        usage in usage_strategy(),
        extra in 0i64..100_000i64,
        rate in rate_strategy(),
        tax in 0u8..=100u8,
    ) {
        let tariff = tariff(rate, dec!(2500), Decimal::from(tax));
        let calculator = BillCalculator::new();

        let base = calculator.calculate(usage, &tariff);
        let more = calculator.calculate(usage + Decimal::new(extra, 2), &tariff);

        prop_assert!(more.total_amount >= base.total_amount);
    }
}
