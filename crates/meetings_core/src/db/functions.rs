//! Store-native scalar functions used by meeting queries.
//!
//! # Responsibility
//! - `coerce_date(value)`: turn date text or epoch milliseconds into epoch
//!   milliseconds, raising a query error for anything else.
//! - `ci_contains(haystack, needle)`: case-insensitive literal substring test.
//!
//! # Invariants
//! - Both functions are deterministic and registered on every connection
//!   before migrations run.
//! - `NULL` inputs never match and never raise.

use crate::model::timestamp::coerce_timestamp;
use regex::{Regex, RegexBuilder};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Error};
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(crate) const COERCE_DATE_FN: &str = "coerce_date";
pub(crate) const CI_CONTAINS_FN: &str = "ci_contains";

/// Registers all scalar functions on `conn`.
pub(crate) fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function(COERCE_DATE_FN, 1, flags, |ctx| {
        match ctx.get_raw(0) {
            ValueRef::Null => Ok(None),
            ValueRef::Integer(millis) => Ok(Some(millis)),
            ValueRef::Text(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                coerce_timestamp(&text).map(Some).ok_or_else(|| {
                    Error::UserFunctionError(format!("cannot coerce `{text}` to a date").into())
                })
            }
            other => Err(Error::UserFunctionError(
                format!("cannot coerce {} value to a date", other.data_type()).into(),
            )),
        }
    })?;

    conn.create_scalar_function(CI_CONTAINS_FN, 2, flags, |ctx| {
        let needle: Arc<Regex> = ctx.get_or_create_aux(1, |raw| -> Result<Regex, BoxError> {
            let needle = raw.as_str()?;
            Ok(RegexBuilder::new(&regex::escape(needle))
                .case_insensitive(true)
                .build()?)
        })?;
        let haystack = ctx.get::<Option<String>>(0)?;
        Ok(haystack.is_some_and(|value| needle.is_match(&value)))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::register_functions;
    use rusqlite::Connection;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        conn
    }

    #[test]
    fn coerce_date_accepts_text_and_integers() {
        let conn = connection();
        let from_text: i64 = conn
            .query_row("SELECT coerce_date('2024-06-01');", [], |row| row.get(0))
            .unwrap();
        let from_int: i64 = conn
            .query_row("SELECT coerce_date(1717200000000);", [], |row| row.get(0))
            .unwrap();
        assert_eq!(from_text, 1_717_200_000_000);
        assert_eq!(from_int, from_text);
    }

    #[test]
    fn coerce_date_raises_on_garbage() {
        let conn = connection();
        let err = conn
            .query_row("SELECT coerce_date('not a date');", [], |row| {
                row.get::<_, i64>(0)
            })
            .unwrap_err();
        assert!(err.to_string().contains("not a date"));
    }

    #[test]
    fn ci_contains_is_case_insensitive_and_literal() {
        let conn = connection();
        let matches = |haystack: Option<&str>, needle: &str| -> bool {
            conn.query_row(
                "SELECT ci_contains(?1, ?2);",
                rusqlite::params![haystack, needle],
                |row| row.get(0),
            )
            .unwrap()
        };

        assert!(matches(Some("Alice@Example.com"), "alice@"));
        assert!(matches(Some("Quarterly Review"), "REVIEW"));
        assert!(!matches(Some("Quarterly Review"), "q.*w"));
        assert!(matches(Some("a.b"), "a.b"));
        assert!(!matches(None, "anything"));
    }
}
