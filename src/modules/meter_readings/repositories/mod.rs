pub mod meter_reading_repository;

pub use meter_reading_repository::MeterReadingRepository;
