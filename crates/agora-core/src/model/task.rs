//! Delegated task types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use super::{AgentId, ConversationId, TaskId};

/// Default priority of a delegated task (lower is more urgent)
pub const DEFAULT_TASK_PRIORITY: i32 = 5;

/// Status of a delegated task
///
/// `Pending -> InProgress -> {Completed, Failed, Cancelled, TimedOut}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::TimedOut
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "timed_out" => Ok(Self::TimedOut),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// A task delegated from one agent to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTask {
    pub id: TaskId,
    pub conversation_id: ConversationId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub assigned_to_agent_id: AgentId,
    pub created_by_agent_id: AgentId,
    pub parent_task_id: Option<TaskId>,
    /// Parent depth + 1; root tasks are 0. Written once at creation.
    pub delegation_depth: u32,
    pub result: Option<String>,
    pub error: Option<String>,
    pub timeout_seconds: u64,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input of `delegate_task`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub conversation_id: ConversationId,
    pub created_by_agent_id: AgentId,
    pub assigned_to_agent_id: AgentId,
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub parent_task_id: Option<TaskId>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub metadata: JsonValue,
}

fn default_priority() -> i32 {
    DEFAULT_TASK_PRIORITY
}

impl DelegationRequest {
    pub fn new(
        conversation_id: ConversationId,
        created_by_agent_id: AgentId,
        assigned_to_agent_id: AgentId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            created_by_agent_id,
            assigned_to_agent_id,
            title: title.into(),
            description: description.into(),
            priority: DEFAULT_TASK_PRIORITY,
            parent_task_id: None,
            timeout_seconds: None,
            metadata: JsonValue::Null,
        }
    }

    pub fn with_parent(mut self, parent_task_id: TaskId) -> Self {
        self.parent_task_id = Some(parent_task_id);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_seconds = Some(secs);
        self
    }
}
