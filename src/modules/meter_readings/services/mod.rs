pub mod meter_reading_service;

pub use meter_reading_service::MeterReadingService;
