//! Tau conversion.
//!
//! Tau values are hours since 1985-01-01 00:00 UTC. They are stored as
//! Julian day numbers (`EPOCH_DAY_NUMBER + tau / 24`) and can also be turned
//! into `chrono` timestamps.

use crate::constants::{EPOCH_DAY_NUMBER, HOURS_PER_DAY};
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Day number for a tau value
pub fn tau_to_day_number(tau: f64) -> f64 {
    EPOCH_DAY_NUMBER + tau / HOURS_PER_DAY
}

/// Inverse of [`tau_to_day_number`]
pub fn day_number_to_tau(day_number: f64) -> f64 {
    (day_number - EPOCH_DAY_NUMBER) * HOURS_PER_DAY
}

pub fn tau_epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1985, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// UTC timestamp for a tau value, to millisecond precision
pub fn tau_to_datetime(tau: f64) -> DateTime<Utc> {
    let millis = (tau * 3_600_000.0).round() as i64;
    tau_epoch() + Duration::milliseconds(millis)
}

pub fn datetime_to_tau(timestamp: DateTime<Utc>) -> f64 {
    (timestamp - tau_epoch()).num_milliseconds() as f64 / 3_600_000.0
}
