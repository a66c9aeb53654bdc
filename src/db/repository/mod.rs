//! Repository layer: the fixed statement catalogue, one sub-module per table.
//!
//! Every function takes the owned [`Store`] handle and runs a literal SQL
//! statement with positional parameters, so each call goes through the
//! store's save policy.

mod images;
mod patients;
mod progress;
mod reports;
mod users;
mod visits;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::{DatabaseError, Store};

pub use images::*;
pub use patients::*;
pub use progress::*;
pub use reports::*;
pub use users::*;
pub use visits::*;

/// Text form written by `CURRENT_TIMESTAMP`. Values we write use it too, so
/// `ORDER BY` on the text column sorts chronologically.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the SQLite default form, ISO 8601 with
/// or without offset, and bare dates (read as midnight).
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Run a `SELECT COUNT(*)` statement; an empty result counts as zero.
pub(crate) fn count<P: rusqlite::Params>(
    store: &mut Store,
    sql: &str,
    params: P,
) -> Result<i64, DatabaseError> {
    Ok(store
        .query_first(sql, params, |row| row.get::<_, i64>(0))?
        .unwrap_or(0))
}
