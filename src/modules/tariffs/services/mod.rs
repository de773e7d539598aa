pub mod tariff_resolver;

pub use tariff_resolver::TariffResolver;
