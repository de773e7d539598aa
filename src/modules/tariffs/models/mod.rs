mod tariff;

pub use tariff::{NewTariff, Tariff};
