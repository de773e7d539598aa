pub mod billing_month;
pub mod clock;
pub mod error;
pub mod identifiers;
pub mod identity;
pub mod money;
pub mod response;

pub use billing_month::BillingMonth;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AppError, ErrorCategory, ErrorKind, Result};
pub use identity::{Caller, Role};
pub use response::ApiResponse;
