use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::AppError;

/// Connected-load class of a customer, in VA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum PowerCapacity {
    Va450,
    Va900,
    Va1300,
    Va2200,
    Va3500,
    Va5500,
}

impl PowerCapacity {
    pub const ALL: [PowerCapacity; 6] = [
        PowerCapacity::Va450,
        PowerCapacity::Va900,
        PowerCapacity::Va1300,
        PowerCapacity::Va2200,
        PowerCapacity::Va3500,
        PowerCapacity::Va5500,
    ];

    pub fn va(&self) -> i32 {
        match self {
            PowerCapacity::Va450 => 450,
            PowerCapacity::Va900 => 900,
            PowerCapacity::Va1300 => 1300,
            PowerCapacity::Va2200 => 2200,
            PowerCapacity::Va3500 => 3500,
            PowerCapacity::Va5500 => 5500,
        }
    }
}

impl TryFrom<i32> for PowerCapacity {
    type Error = String;

    fn try_from(va: i32) -> Result<Self, Self::Error> {
        PowerCapacity::ALL
            .iter()
            .copied()
            .find(|class| class.va() == va)
            .ok_or_else(|| format!("Unsupported power capacity: {} VA", va))
    }
}

impl From<PowerCapacity> for i32 {
    fn from(class: PowerCapacity) -> Self {
        class.va()
    }
}

impl fmt::Display for PowerCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} VA", self.va())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerStatus::Active => write!(f, "active"),
            CustomerStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for CustomerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CustomerStatus::Active),
            "inactive" => Ok(CustomerStatus::Inactive),
            _ => Err(format!("Invalid customer status: {}", s)),
        }
    }
}

/// Electricity customer. Owns its readings, and through them its bills and payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,

    /// Login account, absent for customers created without one
    pub user_id: Option<i64>,

    /// Unique customer number printed on bills
    pub customer_number: String,

    pub full_name: String,
    pub address: String,
    pub phone: Option<String>,
    pub power_capacity: PowerCapacity,
    pub status: CustomerStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    /// True when `user_id` is the login account attached to this customer
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}

/// Fields needed to register a customer row
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub user_id: Option<i64>,
    pub customer_number: String,
    pub full_name: String,
    pub address: String,
    pub phone: Option<String>,
    pub power_capacity: PowerCapacity,
    pub status: CustomerStatus,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.customer_number.trim().is_empty() {
            return Err(AppError::validation("Customer number cannot be empty"));
        }
        if self.full_name.trim().is_empty() {
            return Err(AppError::validation("Full name cannot be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(AppError::validation("Address cannot be empty"));
        }
        Ok(())
    }
}
