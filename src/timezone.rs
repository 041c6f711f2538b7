//! Wall-clock → canonical instant conversion.
//!
//! Callers submit appointment times as zoneless wall-clock values; each
//! professional declares an IANA zone id. Normalization interprets the
//! wall-clock time in that zone and yields a UTC unix-ms instant. Lookup
//! failure is non-fatal: the time is taken as already-UTC and the result
//! is flagged so the caller can log it.

use chrono::{LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::model::Ms;

/// Result of normalizing a wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedStart {
    /// UTC unix milliseconds.
    pub instant: Ms,
    /// True when the zone id was unknown or the wall-clock time does not
    /// exist in the zone (DST gap) and the input was taken as UTC.
    pub utc_fallback: bool,
}

/// Interpret `local` in the zone named by `tz_id`. Pure and total: always
/// returns a best-effort instant, never an error.
pub fn normalize(local: NaiveDateTime, tz_id: &str) -> NormalizedStart {
    let Ok(tz) = tz_id.parse::<Tz>() else {
        return NormalizedStart {
            instant: local.and_utc().timestamp_millis(),
            utc_fallback: true,
        };
    };
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => NormalizedStart {
            instant: dt.timestamp_millis(),
            utc_fallback: false,
        },
        // Clocks rolled back: the wall-clock time happens twice. Take the
        // earlier occurrence.
        LocalResult::Ambiguous(earliest, _) => NormalizedStart {
            instant: earliest.timestamp_millis(),
            utc_fallback: false,
        },
        // Clocks jumped forward: the wall-clock time never happens.
        LocalResult::None => NormalizedStart {
            instant: local.and_utc().timestamp_millis(),
            utc_fallback: true,
        },
    }
}
