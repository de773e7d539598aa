// Payments module

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Decision, Payment, PaymentMethod, PaymentStatus};
pub use repositories::PaymentRepository;
pub use services::PaymentVerifier;
