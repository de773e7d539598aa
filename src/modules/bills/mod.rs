// Bills module

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{derive_display_status, Bill, BillStatus, DisplayStatus, ReadingSelector};
pub use repositories::BillRepository;
pub use services::{BillCalculator, BillGenerator, BillService};
