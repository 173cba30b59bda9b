use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::engine::Error;
use crate::model::Ts;

/// Boundary timestamp format, minute precision, no timezone (interpreted as UTC).
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn now_ts() -> Ts {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as Ts
}

/// Parse a `YYYY-MM-DD HH:MM` stamp. Malformed input is a user error, not a fault.
pub fn parse_stamp(s: &str) -> Result<Ts, Error> {
    NaiveDateTime::parse_from_str(s, STAMP_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|e| Error::Parse(format!("{s:?}: {e}")))
}

pub fn format_stamp(ts: Ts) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format(STAMP_FORMAT).to_string(),
        None => ts.to_string(),
    }
}

/// Number of days in the given month, `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Unix seconds at 00:00 of the given calendar day.
pub fn midnight(year: i32, month: u32, day: u32) -> Option<Ts> {
    let dt = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(dt.and_utc().timestamp())
}
