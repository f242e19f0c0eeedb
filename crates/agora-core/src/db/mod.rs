//! SQLite persistence
//!
//! [`Database`] owns the connection and the schema. Callers open a
//! [`UnitOfWork`] per logical request, hand `&UnitOfWork` to components and
//! commit or roll back themselves. Components only ever see a shared
//! reference, so they cannot end the transaction.
//!
//! Each store is a thin borrowed view over the unit of work.

mod agents;
mod handoffs;
mod memory;
mod messages;
mod routing_log;
mod schema;
mod sessions;
mod tasks;

pub use agents::AgentStore;
pub use handoffs::HandoffStore;
pub use memory::{MemoryRepository, SqliteMemoryRepository};
pub use messages::MessageStore;
pub use routing_log::RoutingLogStore;
pub use sessions::SessionStore;
pub use tasks::TaskStore;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, Result};

/// Owner of the SQLite connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and its schema
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening database at: {}", path.display());
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_tables()?;
        info!("Database initialized successfully");
        Ok(db)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    /// Start a unit of work
    pub fn begin(&mut self) -> Result<UnitOfWork<'_>> {
        let tx = self.conn.transaction()?;
        Ok(UnitOfWork { tx })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// A caller-owned transactional session
///
/// Components receive `&UnitOfWork` and write through it; only the owner
/// can [`commit`](Self::commit) or [`rollback`](Self::rollback).
pub struct UnitOfWork<'c> {
    tx: Transaction<'c>,
}

impl<'c> UnitOfWork<'c> {
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    pub fn agents(&self) -> AgentStore<'_> {
        AgentStore::new(self.conn())
    }

    pub fn handoffs(&self) -> HandoffStore<'_> {
        HandoffStore::new(self.conn())
    }

    pub fn tasks(&self) -> TaskStore<'_> {
        TaskStore::new(self.conn())
    }

    pub fn messages(&self) -> MessageStore<'_> {
        MessageStore::new(self.conn())
    }

    pub fn sessions(&self) -> SessionStore<'_> {
        SessionStore::new(self.conn())
    }

    pub fn routing_log(&self) -> RoutingLogStore<'_> {
        RoutingLogStore::new(self.conn())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

// ============================================================================
// Column helpers
// ============================================================================

pub(crate) fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn opt_ts_to_sql(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(ts_to_sql)
}

/// Unsigned value for an INTEGER column; values beyond `i64::MAX` are refused
pub(crate) fn u64_to_sql(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::InvalidData(format!("{} out of range: {}", column, value)))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_error(idx: usize, message: String) -> rusqlite::Error {
    conversion_error(idx, std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

/// Deserialize a JSON column; NULL reads as JSON `null`
pub(crate) fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let s: Option<String> = row.get(idx)?;
    serde_json::from_str(s.as_deref().unwrap_or("null")).map_err(|e| conversion_error(idx, e))
}

/// Parse an enum stored as its text form
pub(crate) fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| parse_error(idx, e))
}

pub(crate) fn opt_enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    let s: Option<String> = row.get(idx)?;
    s.map(|s| s.parse().map_err(|e| parse_error(idx, e)))
        .transpose()
}
