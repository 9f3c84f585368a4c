//! Wall-clock helpers.
//!
//! Airports carry whole-hour UTC offsets; flights are published in local
//! time-of-day. Everything the reservation layer stores is UTC.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, Utc};

/// Converts a whole-hour GMT offset to a [`FixedOffset`].
///
/// Out-of-range offsets resolve to UTC; [`crate::validation`] rejects them
/// before they reach a [`Network`](super::Network).
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Interprets a local wall-clock time at `offset` as a UTC instant.
#[inline]
pub fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// Local wall-clock time at `offset` for a UTC instant.
#[inline]
pub fn utc_to_local(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    instant.with_timezone(&offset).naive_local()
}

/// Whole minutes between two instants (`to - from`).
#[inline]
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}
