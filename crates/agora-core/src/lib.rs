//! agora-core: shared foundation of the agent collaboration subsystem
//!
//! Data model, typed configuration, error types and the SQLite unit of work
//! that every collaboration component writes into.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{CollaborationSettings, Config, DatabaseConfig, FeatureFlags};
pub use db::{Database, MemoryRepository, SqliteMemoryRepository, UnitOfWork};
pub use error::{Decision, Error, Rejection, RejectionKind, Result};
