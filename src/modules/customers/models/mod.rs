mod customer;

pub use customer::{Customer, CustomerStatus, NewCustomer, PowerCapacity};
