use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use super::billing_month::BillingMonth;

/// Offset of Asia/Jakarta (WIB), the utility's operating timezone. No DST.
const JAKARTA_OFFSET_SECS: i32 = 7 * 3600;

fn jakarta_offset() -> FixedOffset {
    FixedOffset::east_opt(JAKARTA_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Source of "now" for due dates, payment dates and the default billing month
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar date in Asia/Jakarta
    fn today(&self) -> NaiveDate {
        to_jakarta(self.now()).date_naive()
    }

    /// Local calendar month in Asia/Jakarta
    fn current_month(&self) -> BillingMonth {
        BillingMonth::of(self.today())
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Convert a UTC timestamp to Asia/Jakarta local time
pub fn to_jakarta(utc_time: DateTime<Utc>) -> DateTime<FixedOffset> {
    utc_time.with_timezone(&jakarta_offset())
}
