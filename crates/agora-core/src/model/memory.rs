//! Memory type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use super::{AgentId, TeamId};

/// Kind of a stored memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Private to one agent
    Agent,
    /// Shared with every agent of a team
    TeamShared,
    /// Captured from a conversation
    Conversation,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::TeamShared => "team_shared",
            Self::Conversation => "conversation",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(Self::Agent),
            "team_shared" => Ok(Self::TeamShared),
            "conversation" => Ok(Self::Conversation),
            other => Err(format!("unknown memory type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    #[default]
    Active,
    Archived,
}

impl MemoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for MemoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown memory status: {}", other)),
        }
    }
}

/// A memory entry stored in the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: uuid::Uuid,
    pub team_id: TeamId,
    /// Author of the memory, if any
    pub agent_id: Option<AgentId>,
    pub memory_type: MemoryType,
    pub status: MemoryStatus,
    pub content: String,
    pub importance: f32,
    pub metadata: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMemory {
    pub team_id: TeamId,
    pub agent_id: Option<AgentId>,
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: f32,
    pub metadata: JsonValue,
    pub embedding: Option<Vec<f32>>,
}

impl NewMemory {
    pub fn new(team_id: TeamId, memory_type: MemoryType, content: impl Into<String>) -> Self {
        Self {
            team_id,
            agent_id: None,
            memory_type,
            content: content.into(),
            importance: 0.5,
            metadata: JsonValue::Null,
            embedding: None,
        }
    }
}

/// Compact view of a stored team memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub id: uuid::Uuid,
    pub team_id: TeamId,
    pub agent_id: Option<AgentId>,
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: f32,
    pub created_at: DateTime<Utc>,
}

impl From<&Memory> for MemorySummary {
    fn from(memory: &Memory) -> Self {
        Self {
            id: memory.id,
            team_id: memory.team_id,
            agent_id: memory.agent_id,
            memory_type: memory.memory_type,
            content: memory.content.clone(),
            importance: memory.importance,
            created_at: memory.created_at,
        }
    }
}

/// Cosine similarity of two vectors; 0 when lengths differ or either is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
