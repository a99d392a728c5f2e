//! Conversion between `chrono::DateTime<Utc>` and the wire format's
//! "ticks" unit: 100ns intervals since `0001-01-01 00:00:00 UTC`.
//!
//! This is the one place a native-epoch assumption could silently corrupt
//! the on-disk format, so it is kept small and round-trip tested.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_DAY: i64 = TICKS_PER_SECOND * 86_400;

/// `NaiveDate::num_days_from_ce()` for 0001-01-01 is 1 (day 1 of the
/// proleptic Gregorian calendar), so we subtract that offset to get
/// "days since the tick epoch" rather than "days since CE".
const EPOCH_DAYS_FROM_CE: i64 = 1;

/// Converts to ticks, saturating at `i64::MIN`/`MAX` for instants whose tick
/// value would overflow — notably the "no LWT known" sentinel
/// (`DateTime::<Utc>::MIN_UTC`), whose day count times `TICKS_PER_DAY` far
/// exceeds `i64`'s range. Saturating here, rather than panicking, keeps a
/// corrupted on-disk entry that decoded to that sentinel re-serializable.
pub fn datetime_to_ticks(dt: DateTime<Utc>) -> i64 {
    let naive = dt.naive_utc();
    let days = naive.date().num_days_from_ce() as i64 - EPOCH_DAYS_FROM_CE;
    let seconds_of_day = naive.time().num_seconds_from_midnight() as i64;
    let nanos = naive.time().nanosecond() as i64;

    days.saturating_mul(TICKS_PER_DAY)
        .saturating_add(seconds_of_day.saturating_mul(TICKS_PER_SECOND))
        .saturating_add(nanos / 100)
}

pub fn ticks_to_datetime(ticks: i64) -> DateTime<Utc> {
    let days = ticks.div_euclid(TICKS_PER_DAY);
    let remainder = ticks.rem_euclid(TICKS_PER_DAY);
    let seconds_of_day = remainder / TICKS_PER_SECOND;
    let sub_second_ticks = remainder % TICKS_PER_SECOND;
    let nanos = sub_second_ticks * 100;

    let date = NaiveDate::from_num_days_from_ce_opt((days + EPOCH_DAYS_FROM_CE) as i32)
        .unwrap_or(NaiveDate::MIN);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds_of_day as u32, nanos as u32)
        .unwrap_or(NaiveTime::MIN);

    DateTime::<Utc>::from_naive_utc_and_offset(NaiveDateTime::new(date, time), Utc)
}
