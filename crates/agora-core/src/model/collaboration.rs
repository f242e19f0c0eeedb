//! Collaboration session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use super::{AgentId, ConversationId, SessionId, TeamId};

/// Multi-agent collaboration strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationPattern {
    SupervisorWorker,
    Pipeline,
    PeerReview,
    Brainstorm,
    Consensus,
    Delegation,
}

impl CollaborationPattern {
    pub const ALL: [Self; 6] = [
        Self::SupervisorWorker,
        Self::Pipeline,
        Self::PeerReview,
        Self::Brainstorm,
        Self::Consensus,
        Self::Delegation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SupervisorWorker => "supervisor_worker",
            Self::Pipeline => "pipeline",
            Self::PeerReview => "peer_review",
            Self::Brainstorm => "brainstorm",
            Self::Consensus => "consensus",
            Self::Delegation => "delegation",
        }
    }
}

impl fmt::Display for CollaborationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollaborationPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid collaboration pattern '{}'. Expected one of: {}",
                    s,
                    Self::ALL.map(|p| p.as_str()).join(", ")
                )
            })
    }
}

/// Status of a collaboration session
///
/// `Active -> {Completed, Failed, TimedOut, Cancelled}`; terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "timed_out" => Ok(Self::TimedOut),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

/// Role of an agent inside a collaboration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// Supervisor, creator or delegator depending on the pattern
    Primary,
    /// Worker, reviewer or delegate
    #[serde(alias = "assistant")]
    Invited,
    /// Non-acting
    Observer,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Invited => "invited",
            Self::Observer => "observer",
        }
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "invited" | "assistant" => Ok(Self::Invited),
            "observer" => Ok(Self::Observer),
            other => Err(format!("unknown participant role: {}", other)),
        }
    }
}

/// One recorded step of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: String,
    pub agent_id: AgentId,
    pub output: String,
    pub completed_at: DateTime<Utc>,
}

impl StageOutput {
    pub fn new(stage: impl Into<String>, agent_id: AgentId, output: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            agent_id,
            output: output.into(),
            completed_at: Utc::now(),
        }
    }
}

/// A multi-agent collaboration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationSession {
    pub id: SessionId,
    pub conversation_id: ConversationId,
    /// `None` only for sessions rejected at creation because the pattern was invalid
    pub pattern: Option<CollaborationPattern>,
    pub goal: String,
    pub status: SessionStatus,
    /// Audit trail in execution order
    pub stage_outputs: Vec<StageOutput>,
    pub total_cost: f64,
    pub total_duration_ms: u64,
    pub metadata: JsonValue,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_result: Option<String>,
}

impl CollaborationSession {
    pub fn new(
        conversation_id: ConversationId,
        pattern: CollaborationPattern,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            conversation_id,
            pattern: Some(pattern),
            goal: goal.into(),
            status: SessionStatus::Active,
            stage_outputs: Vec::new(),
            total_cost: 0.0,
            total_duration_ms: 0,
            metadata: JsonValue::Null,
            started_at: Utc::now(),
            completed_at: None,
            final_result: None,
        }
    }
}

/// A participant row of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationParticipant {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub role: ParticipantRole,
    pub contribution: Option<String>,
    pub turn_count: u32,
    pub cost: f64,
    pub joined_at: DateTime<Utc>,
}

/// Orchestrator input describing one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub agent_id: AgentId,
    pub role: ParticipantRole,
    #[serde(default)]
    pub instructions: String,
    /// Upstream agents; only the pipeline pattern reads this
    #[serde(default)]
    pub dependencies: Vec<AgentId>,
}

impl ParticipantConfig {
    pub fn new(agent_id: AgentId, role: ParticipantRole) -> Self {
        Self {
            agent_id,
            role,
            instructions: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn primary(agent_id: AgentId) -> Self {
        Self::new(agent_id, ParticipantRole::Primary)
    }

    pub fn invited(agent_id: AgentId) -> Self {
        Self::new(agent_id, ParticipantRole::Invited)
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn depends_on(mut self, agent_id: AgentId) -> Self {
        self.dependencies.push(agent_id);
        self
    }
}

/// Boundary request for creating a session; the pattern is raw text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub conversation_id: ConversationId,
    pub pattern: String,
    pub goal: String,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
}

/// Boundary request for `update_session_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: SessionStatus,
    #[serde(default)]
    pub final_result: Option<String>,
}
