pub mod models;
pub mod repositories;
pub mod services;

pub use models::{NewTariff, Tariff};
pub use repositories::TariffRepository;
pub use services::TariffResolver;
