//! Agent-to-agent handoffs
//!
//! The number of handoffs recorded for a conversation is its handoff depth.
//! A new handoff is refused once the depth reaches the configured maximum.
//! The count and the insert are two statements in the caller's unit of work;
//! two parallel units of work can both pass the check, so the bound is soft
//! under concurrency.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use agora_core::model::{
    AgentHandoff, AgentId, ConversationId, HandoffRequest, HandoffResult, NewRoutingLog,
    RoutingStrategy,
};
use agora_core::{CollaborationSettings, Result, UnitOfWork};

use crate::routing_log::RoutingLogger;

/// Context key whose text is copied into the routing log
pub const USER_MESSAGE_KEY: &str = "user_message";

/// Keep at most `max` characters
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

pub struct HandoffManager {
    settings: CollaborationSettings,
    logger: RoutingLogger,
}

impl HandoffManager {
    pub fn new(settings: CollaborationSettings) -> Self {
        Self {
            settings,
            logger: RoutingLogger::new(),
        }
    }

    /// Record a handoff unless the conversation is already at maximum depth
    ///
    /// A refusal is `success == false`, not an error. Storage failures propagate.
    pub async fn initiate_handoff(&self, uow: &UnitOfWork<'_>, request: HandoffRequest) -> Result<HandoffResult> {
        let max_depth = self.settings.max_delegation_depth;
        let depth = uow.handoffs().count_for_conversation(request.conversation_id)?;

        if depth >= max_depth {
            warn!(
                conversation_id = %request.conversation_id,
                depth,
                "Handoff from {} to {} refused",
                request.from_agent_id,
                request.to_agent_id
            );
            return Ok(HandoffResult {
                success: false,
                handoff_id: None,
                reason: format!(
                    "Maximum delegation depth ({}) reached for conversation {} ({} handoffs recorded)",
                    max_depth, request.conversation_id, depth
                ),
                depth,
            });
        }

        let message = match request.context.get(USER_MESSAGE_KEY) {
            Some(JsonValue::String(text)) => text.clone(),
            _ => request.reason.clone(),
        };

        let handoff = AgentHandoff {
            id: uuid::Uuid::new_v4(),
            conversation_id: request.conversation_id,
            from_agent_id: request.from_agent_id,
            to_agent_id: request.to_agent_id,
            reason: request.reason,
            context: request.context,
            handoff_at: Utc::now(),
        };
        uow.handoffs().insert(&handoff)?;

        let mut scores = BTreeMap::new();
        scores.insert(handoff.to_agent_id.to_string(), 1.0);
        self.logger
            .log_routing_decision(
                uow,
                NewRoutingLog {
                    conversation_id: Some(handoff.conversation_id),
                    user_message: truncate_chars(&message, self.settings.max_logged_message_chars),
                    selected_agent_id: handoff.to_agent_id,
                    scores,
                    confidence: 1.0,
                    strategy: RoutingStrategy::Handoff,
                    latency_ms: 0,
                },
            )
            .await?;

        info!(
            conversation_id = %handoff.conversation_id,
            handoff_id = %handoff.id,
            "Handoff from {} to {} recorded",
            handoff.from_agent_id,
            handoff.to_agent_id
        );

        Ok(HandoffResult {
            success: true,
            handoff_id: Some(handoff.id),
            reason: handoff.reason,
            depth: depth + 1,
        })
    }

    /// Note that the receiving agent finished; nothing is persisted
    pub fn complete_handoff(
        &self,
        conversation_id: ConversationId,
        from_agent_id: AgentId,
        to_agent_id: AgentId,
        outcome: &str,
    ) {
        info!(
            conversation_id = %conversation_id,
            "Handoff from {} to {} completed: {}",
            from_agent_id,
            to_agent_id,
            outcome
        );
    }

    /// Most recent handoffs first
    pub async fn get_handoff_history(
        &self,
        uow: &UnitOfWork<'_>,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<AgentHandoff>> {
        uow.handoffs().recent(conversation_id, limit)
    }
}
