use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money::validate_amount;
use crate::core::AppError;
use crate::modules::customers::models::PowerCapacity;

/// Price list for one power-capacity class, effective from a date
///
/// Several rows per class may exist; the effective one for a date is the latest
/// active row with `effective_date <= date`. Deactivation is soft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub power_capacity: PowerCapacity,
    pub rate_per_kwh: Decimal,
    pub admin_fee: Decimal,
    /// Percent, e.g. `10` for 10%
    pub tax_percentage: Decimal,
    pub effective_date: NaiveDate,
    pub is_active: bool,
}

impl Tariff {
    /// Whether this tariff may apply on `date`
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.effective_date <= date
    }
}

/// Fields needed to register a tariff row
#[derive(Debug, Clone)]
pub struct NewTariff {
    pub power_capacity: PowerCapacity,
    pub rate_per_kwh: Decimal,
    pub admin_fee: Decimal,
    pub tax_percentage: Decimal,
    pub effective_date: NaiveDate,
}

impl NewTariff {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.rate_per_kwh <= Decimal::ZERO {
            return Err(AppError::validation("Rate per kWh must be positive"));
        }
        validate_amount("Admin fee", self.admin_fee).map_err(AppError::Validation)?;
        if self.tax_percentage < Decimal::ZERO || self.tax_percentage > Decimal::ONE_HUNDRED {
            return Err(AppError::validation(
                "Tax percentage must be between 0 and 100",
            ));
        }
        Ok(())
    }
}
