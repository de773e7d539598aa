// Meter readings module

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{MeterReading, NewMeterReading, RecordReadingRequest, UpdateReadingRequest};
pub use repositories::MeterReadingRepository;
pub use services::MeterReadingService;
