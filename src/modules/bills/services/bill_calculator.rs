use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money::round_money;
use crate::modules::tariffs::models::Tariff;

/// Charge breakdown of one bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillCharges {
    pub electricity_charge: Decimal,
    pub admin_fee: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Turns usage and a tariff into charges. Pure and deterministic.
pub struct BillCalculator;

impl BillCalculator {
    pub fn new() -> Self {
        Self
    }

    /// electricity_charge = usage × rate
    /// tax_amount = electricity_charge × tax% / 100
    /// total_amount = electricity_charge + admin_fee + tax_amount
    ///
    /// Each component is rounded to 2 places (midpoint away from zero) and the
    /// total is the sum of the rounded components.
    pub fn calculate(&self, usage_kwh: Decimal, tariff: &Tariff) -> BillCharges {
        let raw_charge = usage_kwh * tariff.rate_per_kwh;
        let electricity_charge = round_money(raw_charge);
        let admin_fee = round_money(tariff.admin_fee);
        let tax_amount = round_money(raw_charge * tariff.tax_percentage / Decimal::ONE_HUNDRED);

        BillCharges {
            electricity_charge,
            admin_fee,
            tax_amount,
            total_amount: electricity_charge + admin_fee + tax_amount,
        }
    }
}

impl Default for BillCalculator {
    fn default() -> Self {
        Self::new()
    }
}
