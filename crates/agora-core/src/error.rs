//! Error types for agora-core
//!
//! Two layers:
//! - [`Error`]: unexpected failures (storage, malformed rows, runner crashes).
//!   These propagate with `?`.
//! - [`Rejection`]: expected business outcomes (depth exceeded, not found,
//!   invalid transition). These are returned as values inside [`Decision`].

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Main error type for agora-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Agent {agent_id} already participates in session {session_id}")]
    DuplicateParticipant { session_id: Uuid, agent_id: Uuid },

    #[error("Unrecognized collaboration pattern: {0}")]
    InvalidPattern(String),

    #[error("Agent runner error: {0}")]
    Runner(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for agora-core
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a business-rule rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    /// A handoff or delegation would exceed the configured maximum depth
    DepthExceeded,
    /// The referenced entity does not exist
    NotFound,
    /// An agent tried to delegate a task to itself
    SelfDelegation,
    /// The requested status change is not allowed from the current status
    InvalidTransition,
    /// The acting agent is not the one the task is assigned to
    AssignmentMismatch,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepthExceeded => "depth_exceeded",
            Self::NotFound => "not_found",
            Self::SelfDelegation => "self_delegation",
            Self::InvalidTransition => "invalid_transition",
            Self::AssignmentMismatch => "assignment_mismatch",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A negative business decision returned from an operation that otherwise succeeded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn depth_exceeded(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::DepthExceeded, message)
    }

    pub fn not_found(what: &str, id: Uuid) -> Self {
        Self::new(RejectionKind::NotFound, format!("{} {} not found", what, id))
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::InvalidTransition, message)
    }

    /// Render in the legacy `"Error: ..."` form used in textual results
    pub fn to_error_string(&self) -> String {
        format!("Error: {}", self.message)
    }
}

/// Outcome of an operation that may be rejected by a business rule
pub type Decision<T> = std::result::Result<T, Rejection>;
