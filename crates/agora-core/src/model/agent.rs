//! Agent catalog types
//!
//! `AgentRecord` is the persisted agent row with its JSON blobs already
//! deserialised into typed configuration. `AgentProfile` and
//! `AgentAvailability` are derived value objects used for routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::{AgentId, TeamId};

/// Lifecycle status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Paused,
    Archived,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown agent status: {}", other)),
        }
    }
}

/// Personality configuration of an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    /// Short free-text description of the persona
    pub summary: Option<String>,
    /// Trait keywords (e.g. "analytical", "playful")
    pub traits: Vec<String>,
    /// Preferred conversational tone
    pub tone: Option<String>,
}

/// Behavioural limits of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Boundaries {
    /// Doubles as the agent's concurrent task capacity
    pub max_tool_calls_per_turn: u32,
    pub allowed_topics: Vec<String>,
    pub blocked_topics: Vec<String>,
}

impl Default for Boundaries {
    fn default() -> Self {
        Self {
            max_tool_calls_per_turn: 10,
            allowed_topics: Vec::new(),
            blocked_topics: Vec::new(),
        }
    }
}

/// Model selection for an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A persisted agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub team_id: TeamId,
    pub name: String,
    pub tagline: Option<String>,
    pub shared_skills: Vec<String>,
    pub custom_skills: Vec<String>,
    pub disabled_skills: Vec<String>,
    pub personality: Personality,
    pub model_config: ModelConfig,
    pub boundaries: Boundaries,
    pub status: AgentStatus,
    /// Mean response latency observed for this agent
    pub avg_response_ms: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentRecord {
    /// Create a new active agent with no skills
    pub fn new(team_id: TeamId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            team_id,
            name: name.into(),
            tagline: None,
            shared_skills: Vec::new(),
            custom_skills: Vec::new(),
            disabled_skills: Vec::new(),
            personality: Personality::default(),
            model_config: ModelConfig::default(),
            boundaries: Boundaries::default(),
            status: AgentStatus::Active,
            avg_response_ms: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tagline(mut self, tagline: impl Into<String>) -> Self {
        self.tagline = Some(tagline.into());
        self
    }

    pub fn with_shared_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = personality;
        self
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    /// Shared and custom skill names, shared first, without duplicates
    pub fn skill_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.shared_skills
            .iter()
            .chain(self.custom_skills.iter())
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }
}

/// Routing-relevant view of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    pub name: String,
    /// Shared and custom skill names
    pub capabilities: Vec<String>,
    /// Custom skill names only
    pub specializations: Vec<String>,
    pub personality_summary: String,
    pub avg_response_ms: f64,
}

/// Point-in-time capacity of an agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentAvailability {
    pub agent_id: AgentId,
    pub available: bool,
    pub current_load: u32,
    pub max_concurrent_tasks: u32,
    pub estimated_wait_secs: u64,
}
