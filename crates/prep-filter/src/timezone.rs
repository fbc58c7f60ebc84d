//! Timezone normalization for date range bounds.
//!
//! Date ranges are built in the viewer's timezone: a bound is the epoch
//! instant of a local wall-clock time. The backend expects that same
//! wall-clock time expressed as if it were UTC. [`to_wire_millis`] strips the
//! offset and [`from_wire_millis`] puts it back.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone};

use crate::error::{FilterError, FilterResult};

const MILLIS_PER_SECOND: i64 = 1_000;

/// Converts a local epoch bound into its UTC-normalized wire value.
///
/// The result is `t + offset(t)` where `offset(t)` is the UTC offset of `tz`
/// at the instant `t`.
pub fn to_wire_millis<Tz: TimeZone>(tz: &Tz, local_millis: i64) -> FilterResult<i64> {
    let instant = utc_instant(local_millis)?;
    let offset = offset_millis(tz, &instant.naive_utc());

    local_millis
        .checked_add(offset)
        .ok_or(FilterError::TimestampOutOfRange {
            millis: local_millis,
        })
}

/// Converts a UTC-normalized wire value back into a local epoch bound.
///
/// The wire value is read as a wall-clock time in `tz`. In the repeated hour
/// of a backward clock change the earlier instant wins. A wall-clock time
/// inside a forward gap uses the offset in effect before the gap.
pub fn from_wire_millis<Tz: TimeZone>(tz: &Tz, wire_millis: i64) -> FilterResult<i64> {
    let wall_clock = utc_instant(wire_millis)?.naive_utc();

    let local = match tz.from_local_datetime(&wall_clock) {
        LocalResult::Single(local) => return Ok(local.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => return Ok(earliest.timestamp_millis()),
        LocalResult::None => {
            let before_gap = wall_clock
                .checked_sub_signed(Duration::hours(24))
                .ok_or(FilterError::TimestampOutOfRange {
                    millis: wire_millis,
                })?;
            wire_millis.checked_sub(offset_millis(tz, &before_gap))
        }
    };

    local.ok_or(FilterError::TimestampOutOfRange {
        millis: wire_millis,
    })
}

fn utc_instant(millis: i64) -> FilterResult<DateTime<chrono::Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(FilterError::TimestampOutOfRange { millis })
}

fn offset_millis<Tz: TimeZone>(tz: &Tz, utc: &NaiveDateTime) -> i64 {
    let seconds = tz.offset_from_utc_datetime(utc).fix().local_minus_utc();
    i64::from(seconds) * MILLIS_PER_SECOND
}
