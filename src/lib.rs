//! Electricity billing core: meter readings, tariff resolution, bill generation
//! and payment verification over a transactional store.

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;
pub mod store;

// Re-export commonly used types
pub use modules::bills;
pub use modules::meter_readings;
pub use modules::payments;
pub use modules::Services;
