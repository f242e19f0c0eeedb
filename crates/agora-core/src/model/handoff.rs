//! Agent-to-agent handoff types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::{AgentId, ConversationId};

/// A recorded transfer of control between two agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHandoff {
    pub id: uuid::Uuid,
    pub conversation_id: ConversationId,
    pub from_agent_id: AgentId,
    pub to_agent_id: AgentId,
    pub reason: String,
    /// Opaque context handed to the receiving agent
    pub context: Map<String, JsonValue>,
    pub handoff_at: DateTime<Utc>,
}

/// Input of `initiate_handoff`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub conversation_id: ConversationId,
    pub from_agent_id: AgentId,
    pub to_agent_id: AgentId,
    pub reason: String,
    #[serde(default)]
    pub context: Map<String, JsonValue>,
}

impl HandoffRequest {
    pub fn new(
        conversation_id: ConversationId,
        from_agent_id: AgentId,
        to_agent_id: AgentId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            from_agent_id,
            to_agent_id,
            reason: reason.into(),
            context: Map::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Result of a handoff attempt; a rejection is `success == false`, never an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffResult {
    pub success: bool,
    pub handoff_id: Option<uuid::Uuid>,
    pub reason: String,
    /// Handoff count of the conversation when the decision was made
    pub depth: u32,
}
