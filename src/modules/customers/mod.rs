pub mod models;
pub mod repositories;

pub use models::{Customer, CustomerStatus, NewCustomer, PowerCapacity};
pub use repositories::CustomerRepository;
