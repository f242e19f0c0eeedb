//! Routing decision types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{AgentId, ConversationId, UserId};

/// How a routing decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Skill/personality scoring over the agent directory
    MoeGate,
    /// Explicit agent-to-agent handoff
    Handoff,
    /// Multi-agent collaboration recommendation
    Collaboration,
}

impl RoutingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoeGate => "moe_gate",
            Self::Handoff => "handoff",
            Self::Collaboration => "collaboration",
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moe_gate" => Ok(Self::MoeGate),
            "handoff" => Ok(Self::Handoff),
            "collaboration" => Ok(Self::Collaboration),
            other => Err(format!("unknown routing strategy: {}", other)),
        }
    }
}

/// Input of `route_to_agent`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    pub query: String,
    pub user_id: UserId,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub current_agent_id: Option<AgentId>,
}

impl RouteRequest {
    pub fn new(query: impl Into<String>, user_id: UserId) -> Self {
        Self {
            query: query.into(),
            user_id,
            ..Default::default()
        }
    }

    pub fn with_current_agent(mut self, agent_id: AgentId) -> Self {
        self.current_agent_id = Some(agent_id);
        self
    }
}

/// The router's answer for a single query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub selected_agent_id: AgentId,
    /// Within `[0, 1]`; zero means "no routing occurred"
    pub confidence: f64,
    pub reasoning: String,
    /// Runner-up agents, best first
    pub alternatives: Vec<AgentId>,
}

impl RoutingDecision {
    /// A decision that leaves the conversation where it is
    pub fn no_route(current_agent_id: Option<AgentId>, reasoning: impl Into<String>) -> Self {
        Self {
            selected_agent_id: current_agent_id.unwrap_or_else(uuid::Uuid::nil),
            confidence: 0.0,
            reasoning: reasoning.into(),
            alternatives: Vec::new(),
        }
    }
}

/// One recommended participant for a collaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecommendation {
    pub agent_id: AgentId,
    pub name: String,
    pub score: f64,
    pub reasoning: String,
}

/// A row to append to the routing log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoutingLog {
    pub conversation_id: Option<ConversationId>,
    pub user_message: String,
    pub selected_agent_id: AgentId,
    pub scores: BTreeMap<String, f64>,
    pub confidence: f64,
    pub strategy: RoutingStrategy,
    pub latency_ms: u64,
}

/// A persisted routing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecisionLog {
    pub id: uuid::Uuid,
    pub conversation_id: Option<ConversationId>,
    pub user_message: String,
    pub selected_agent_id: AgentId,
    pub scores: BTreeMap<String, f64>,
    pub confidence: f64,
    pub strategy: RoutingStrategy,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Filters for reading the routing log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingHistoryFilter {
    pub conversation_id: Option<ConversationId>,
    pub agent_id: Option<AgentId>,
    pub limit: usize,
    pub since: Option<DateTime<Utc>>,
}

impl Default for RoutingHistoryFilter {
    fn default() -> Self {
        Self {
            conversation_id: None,
            agent_id: None,
            limit: 100,
            since: None,
        }
    }
}

/// Per-agent slice of a routing analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRoutingStats {
    pub agent_id: AgentId,
    pub decision_count: u64,
    pub avg_confidence: f64,
    /// Selection frequency (`decision_count / total_decisions`), not an outcome metric
    pub success_rate: f64,
}

/// Aggregate view over the routing log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingAnalysis {
    pub lookback_days: u32,
    pub total_decisions: u64,
    pub avg_confidence: f64,
    pub avg_latency_ms: f64,
    pub agents: Vec<AgentRoutingStats>,
    pub strategies: BTreeMap<String, u64>,
}
