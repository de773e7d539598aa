use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::{AppError, Result};
use crate::modules::customers::models::PowerCapacity;
use crate::modules::tariffs::models::Tariff;
use crate::store::mysql::{db_error, MySqlUnitOfWork};

#[async_trait]
pub trait TariffRepository: Send {
    /// Latest active tariff for the class with `effective_date <= as_of`.
    /// Ties on `effective_date` go to the most recently inserted row.
    async fn find_effective_tariff(
        &mut self,
        power_capacity: PowerCapacity,
        as_of: NaiveDate,
    ) -> Result<Option<Tariff>>;
}

#[derive(Debug, sqlx::FromRow)]
struct TariffRow {
    id: i64,
    power_capacity: i32,
    rate_per_kwh: Decimal,
    admin_fee: Option<Decimal>,
    tax_percentage: Option<Decimal>,
    effective_date: NaiveDate,
    is_active: bool,
}

impl TariffRow {
    fn into_tariff(self) -> Result<Tariff> {
        let power_capacity = PowerCapacity::try_from(self.power_capacity)
            .map_err(|e| AppError::Internal(format!("Invalid power capacity in database: {}", e)))?;

        Ok(Tariff {
            id: self.id,
            power_capacity,
            rate_per_kwh: self.rate_per_kwh,
            admin_fee: self.admin_fee.unwrap_or(Decimal::ZERO),
            tax_percentage: self.tax_percentage.unwrap_or(Decimal::ZERO),
            effective_date: self.effective_date,
            is_active: self.is_active,
        })
    }
}

#[async_trait]
impl TariffRepository for MySqlUnitOfWork {
    async fn find_effective_tariff(
        &mut self,
        power_capacity: PowerCapacity,
        as_of: NaiveDate,
    ) -> Result<Option<Tariff>> {
        let row = sqlx::query_as::<_, TariffRow>(
            r#"
            SELECT id, power_capacity, rate_per_kwh, admin_fee, tax_percentage,
                   effective_date, is_active
            FROM tariffs
            WHERE power_capacity = ? AND is_active = TRUE AND effective_date <= ?
            ORDER BY effective_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(power_capacity.va())
        .bind(as_of)
        .fetch_optional(self.conn()?)
        .await
        .map_err(db_error("fetch effective tariff"))?;

        row.map(TariffRow::into_tariff).transpose()
    }
}
