pub mod bill_calculator;
pub mod bill_generator;
pub mod bill_service;

pub use bill_calculator::{BillCalculator, BillCharges};
pub use bill_generator::BillGenerator;
pub use bill_service::BillService;
