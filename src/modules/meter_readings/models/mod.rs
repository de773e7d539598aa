mod meter_reading;

pub use meter_reading::{
    LastReading, MeterReading, NewMeterReading, RecordReadingRequest, RecordedReading,
    UpdateReadingRequest,
};
