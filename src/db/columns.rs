//! Conversions between domain values and SQLite column values.
//!
//! Timestamps are stored as RFC 3339 text in UTC and structured payloads as
//! JSON text, so they stay readable with the `sqlite3` shell and usable from
//! SQLite's JSON1 functions.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;

// Fixed-width text so lexicographic order in SQL matches chronological order.
pub fn ts(value: &DateTime<Utc>) -> Value {
    Value::Text(value.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub fn opt_ts(value: &Option<DateTime<Utc>>) -> Value {
    value.as_ref().map(ts).unwrap_or(Value::Null)
}

pub fn json<T: Serialize>(value: &T) -> Value {
    serde_json::to_string(value).map(Value::Text).unwrap_or(Value::Null)
}

pub fn get_ts(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_ts(&raw)
}

pub fn get_opt_ts(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.as_deref().map(parse_ts).transpose()
}

pub fn get_json<T: DeserializeOwned + Default>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        None => Ok(T::default()),
        Some(text) => serde_json::from_str(&text).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))),
    }
}

fn parse_ts(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}
