//! Versioned physical index names.
//!
//! A physical index is named after its logical name followed by the tick
//! count of its creation time, so names sort by age and never collide with
//! the alias itself.

use chrono::{DateTime, Utc};

/// Ticks (100 ns intervals) between 0001-01-01T00:00:00Z and the unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Source of the current time for index naming.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 100 ns ticks since 0001-01-01T00:00:00Z.
pub fn ticks(at: DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS
        + at.timestamp() * TICKS_PER_SECOND
        + i64::from(at.timestamp_subsec_nanos() / 100)
}

/// `{logical}{ticks}`, e.g. `orders638412345678901234`.
pub fn versioned_index_name(logical: &str, at: DateTime<Utc>) -> String {
    format!("{}{}", logical, ticks(at))
}
