//! Clock abstraction for deterministic event-id generation.

use chrono::{DateTime, Utc};
use uuid::{NoContext, Timestamp};

/// Abstraction over system time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Converts a clock reading into a UUID timestamp. Instants before the Unix
/// epoch clamp to the epoch.
pub(crate) fn uuid_timestamp(at: DateTime<Utc>) -> Timestamp {
    let seconds = u64::try_from(at.timestamp()).unwrap_or(0);
    Timestamp::from_unix(NoContext, seconds, at.timestamp_subsec_nanos())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_uuid_timestamp_preserves_millisecond_precision() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
            + chrono::Duration::milliseconds(250);

        let (seconds, nanos) = uuid_timestamp(at).to_unix();

        assert_eq!(seconds, 1_768_471_200);
        assert_eq!(nanos / 1_000_000, 250);
    }

    #[test]
    fn test_uuid_timestamp_clamps_pre_epoch_instants() {
        let at = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();

        let (seconds, _) = uuid_timestamp(at).to_unix();

        assert_eq!(seconds, 0);
    }
}
