pub mod meter_reading_controller;

pub use meter_reading_controller::configure;
