//! SQLite-backed store for meetings and the steering profile.
//!
//! The database lives at `~/.prepline/prepline.db`. List-typed meeting
//! fields (attendees, insights, hooks, competitors, draft refs) are stored
//! as JSON text columns; timestamps are RFC 3339 text. The schema is applied
//! idempotently on every open.

mod meetings;
mod steering;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Invalid JSON in {0}: {1}")]
    Json(&'static str, serde_json::Error),

    #[error("Invalid timestamp in {0}: {1}")]
    Timestamp(&'static str, chrono::ParseError),

    #[error("Unknown meeting status: {0}")]
    UnknownStatus(String),
}

/// SQLite connection wrapper for meeting and steering state.
///
/// Intentionally NOT `Clone` or `Sync`: it is held behind a mutex in
/// `MeetingService` so boundary operations access it safely.
pub struct MeetingDb {
    conn: Connection,
}

impl MeetingDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Open (or create) the database at `~/.prepline/prepline.db`.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Used by tests and tools.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.prepline/prepline.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".prepline").join("prepline.db"))
    }
}

// =============================================================================
// Column codecs shared by the table modules
// =============================================================================

fn to_json<T: serde::Serialize>(column: &'static str, value: &T) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|e| DbError::Json(column, e))
}

fn from_json<T: serde::de::DeserializeOwned>(
    column: &'static str,
    raw: &str,
) -> Result<T, DbError> {
    serde_json::from_str(raw).map_err(|e| DbError::Json(column, e))
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Timestamp(column, e))
}

fn parse_timestamp_opt(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    value.map(|v| parse_timestamp(column, v)).transpose()
}
