//! Human-readable bill and payment numbers.
//!
//! Candidates are random; callers check them against the store and retry a bounded
//! number of times, with the unique index as the final guard.

use chrono::{DateTime, Utc};
use rand::Rng;

use super::billing_month::BillingMonth;

/// `{prefix}-{YYYYMM}-{NNNN}`, e.g. `INV-202403-4821`
pub fn bill_number_candidate<R: Rng + ?Sized>(
    prefix: &str,
    month: &BillingMonth,
    rng: &mut R,
) -> String {
    let suffix: u32 = rng.gen_range(1000..=9999);
    format!("{}-{}-{}", prefix, month.compact(), suffix)
}

/// `{prefix}-{YYYYMMDDHHMMSS}-{NNN}` in UTC, e.g. `PAY-20240315083000-512`
pub fn payment_number_candidate<R: Rng + ?Sized>(
    prefix: &str,
    at: DateTime<Utc>,
    rng: &mut R,
) -> String {
    let suffix: u32 = rng.gen_range(100..=999);
    format!("{}-{}-{}", prefix, at.format("%Y%m%d%H%M%S"), suffix)
}

pub fn random_bill_number(prefix: &str, month: &BillingMonth) -> String {
    bill_number_candidate(prefix, month, &mut rand::thread_rng())
}

pub fn random_payment_number(prefix: &str, at: DateTime<Utc>) -> String {
    payment_number_candidate(prefix, at, &mut rand::thread_rng())
}
