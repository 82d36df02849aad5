//! SQLite-backed implementation of every repository trait in this crate.

mod alert;
mod channel;
mod metric;
mod mute;
mod rule;

use crate::error::{Result, StorageError};
use crate::schema;
use chrono::{DateTime, Utc};
use netmon_common::types::Severity;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Single-file SQLite store.
///
/// All access funnels through one connection behind a `Mutex`; WAL mode
/// keeps readers from blocking the writer.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = schema::open_database(path)?;
        tracing::info!(path = %path.display(), "Opened alert database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn to_ms(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_ms(ms: i64, column: &'static str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(StorageError::InvalidValue {
        column,
        value: ms.to_string(),
    })
}

pub(crate) fn from_opt_ms(
    ms: Option<i64>,
    column: &'static str,
) -> Result<Option<DateTime<Utc>>> {
    ms.map(|ms| from_ms(ms, column)).transpose()
}

pub(crate) fn parse_severity(raw: &str, column: &'static str) -> Result<Severity> {
    raw.parse().map_err(|_| StorageError::InvalidValue {
        column,
        value: raw.to_string(),
    })
}

/// Maps a UNIQUE constraint failure onto [`StorageError::Conflict`] so
/// callers can tell duplicate names apart from real SQLite trouble.
pub(crate) fn unique_violation(
    err: rusqlite::Error,
    entity: &'static str,
    name: &str,
) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Conflict {
                entity,
                name: name.to_string(),
            }
        }
        _ => err.into(),
    }
}
