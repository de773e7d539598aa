use chrono::NaiveDate;

use crate::core::{AppError, Result};
use crate::modules::customers::models::PowerCapacity;
use crate::modules::tariffs::models::Tariff;
use crate::modules::tariffs::repositories::TariffRepository;
use crate::store::UnitOfWork;

/// Finds the tariff in force for a power-capacity class on a date
pub struct TariffResolver;

impl TariffResolver {
    /// Resolve inside the caller's unit of work, so the lookup shares its snapshot
    ///
    /// Never falls back to a default rate: no matching row is `TariffNotFound`.
    pub async fn resolve(
        uow: &mut dyn UnitOfWork,
        power_capacity: PowerCapacity,
        as_of: NaiveDate,
    ) -> Result<Tariff> {
        let tariff = uow
            .find_effective_tariff(power_capacity, as_of)
            .await?
            .ok_or_else(|| AppError::TariffNotFound {
                power_capacity: power_capacity.va(),
                as_of: as_of.to_string(),
            })?;

        tracing::debug!(
            tariff_id = tariff.id,
            power_capacity = power_capacity.va(),
            effective_date = %tariff.effective_date,
            "Tariff resolved"
        );

        Ok(tariff)
    }
}
