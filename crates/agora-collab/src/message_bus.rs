//! Best-effort inter-agent mailbox
//!
//! Every public method swallows its own failures and answers with an empty
//! value, so messaging can never be the reason a request fails.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use agora_core::model::{AgentId, AgentMessage, ConversationId, MessageId, MessageType, OutgoingMessage};
use agora_core::{Result, UnitOfWork};

#[derive(Debug, Clone, Copy, Default)]
pub struct AgentMessageBus;

impl AgentMessageBus {
    pub fn new() -> Self {
        Self
    }

    /// Persist a message; `None` for an unknown message type or a storage failure
    pub async fn send_message(&self, uow: &UnitOfWork<'_>, outgoing: OutgoingMessage) -> Option<AgentMessage> {
        let message_type = match outgoing.message_type.parse::<MessageType>() {
            Ok(t) => t,
            Err(e) => {
                warn!("Dropping message from {}: {}", outgoing.from_agent_id, e);
                return None;
            }
        };

        let message = AgentMessage {
            id: uuid::Uuid::new_v4(),
            conversation_id: outgoing.conversation_id,
            from_agent_id: outgoing.from_agent_id,
            to_agent_id: outgoing.to_agent_id,
            message_type,
            subject: outgoing.subject,
            body: outgoing.body,
            metadata: outgoing.metadata,
            created_at: Utc::now(),
            read_at: None,
        };

        match uow.messages().insert(&message) {
            Ok(()) => {
                debug!(
                    message_id = %message.id,
                    "{} message from {} to {}",
                    message.message_type,
                    message.from_agent_id,
                    message.to_agent_id
                );
                Some(message)
            }
            Err(e) => {
                warn!("Failed to send message: {}", e);
                None
            }
        }
    }

    /// Answer a message with the matching reply type
    pub async fn send_reply(
        &self,
        uow: &UnitOfWork<'_>,
        original_id: MessageId,
        body: impl Into<String>,
    ) -> Option<AgentMessage> {
        let original = match uow.messages().get(original_id) {
            Ok(Some(message)) => message,
            Ok(None) => {
                warn!("Cannot reply to unknown message {}", original_id);
                return None;
            }
            Err(e) => {
                warn!("Failed to load message {}: {}", original_id, e);
                return None;
            }
        };

        let subject = if original.subject.is_empty() {
            String::new()
        } else {
            format!("Re: {}", original.subject)
        };
        let reply = OutgoingMessage::new(
            original.conversation_id,
            original.to_agent_id,
            original.from_agent_id,
            original.message_type.reply_type().as_str(),
            body,
        )
        .with_subject(subject)
        .with_metadata(json!({ "in_reply_to": original.id }));

        self.send_message(uow, reply).await
    }

    /// Unread messages for an agent, oldest first
    pub async fn get_pending_messages(
        &self,
        uow: &UnitOfWork<'_>,
        agent_id: AgentId,
        conversation_id: Option<ConversationId>,
    ) -> Vec<AgentMessage> {
        self.or_empty(uow.messages().unread_for_agent(agent_id, conversation_id), "pending messages")
    }

    /// True only when an unread message was marked
    pub async fn mark_as_read(&self, uow: &UnitOfWork<'_>, message_id: MessageId) -> bool {
        match uow.messages().mark_read(message_id, Utc::now()) {
            Ok(marked) => marked,
            Err(e) => {
                warn!("Failed to mark message {} as read: {}", message_id, e);
                false
            }
        }
    }

    /// Chronological page of a conversation, read and unread
    pub async fn get_conversation_messages(
        &self,
        uow: &UnitOfWork<'_>,
        conversation_id: ConversationId,
        limit: usize,
        offset: usize,
    ) -> Vec<AgentMessage> {
        self.or_empty(
            uow.messages().for_conversation(conversation_id, limit, offset),
            "conversation messages",
        )
    }

    fn or_empty(&self, result: Result<Vec<AgentMessage>>, what: &str) -> Vec<AgentMessage> {
        result.unwrap_or_else(|e| {
            warn!("Failed to load {}: {}", what, e);
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::Database;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_mark_as_read_true_then_false() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let message = AgentMessageBus
            .send_message(
                &uow,
                OutgoingMessage::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "notification", "hi"),
            )
            .await
            .unwrap();

        assert!(AgentMessageBus.mark_as_read(&uow, message.id).await);
        assert!(!AgentMessageBus.mark_as_read(&uow, message.id).await);
        assert!(!AgentMessageBus.mark_as_read(&uow, Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_invalid_type_returns_none() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let sent = AgentMessageBus
            .send_message(
                &uow,
                OutgoingMessage::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "gossip", "psst"),
            )
            .await;
        assert!(sent.is_none());
    }

    #[tokio::test]
    async fn test_pending_messages_unread_oldest_first() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let conversation = Uuid::new_v4();
        let (sender, recipient) = (Uuid::new_v4(), Uuid::new_v4());

        let mut ids = Vec::new();
        for body in ["one", "two", "three"] {
            let message = AgentMessageBus
                .send_message(
                    &uow,
                    OutgoingMessage::new(conversation, sender, recipient, "info_request", body),
                )
                .await
                .unwrap();
            ids.push(message.id);
        }
        AgentMessageBus.mark_as_read(&uow, ids[0]).await;

        let pending = AgentMessageBus.get_pending_messages(&uow, recipient, None).await;
        let bodies: Vec<_> = pending.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["two", "three"]);

        let elsewhere = AgentMessageBus
            .get_pending_messages(&uow, recipient, Some(Uuid::new_v4()))
            .await;
        assert!(elsewhere.is_empty());

        let all = AgentMessageBus.get_conversation_messages(&uow, conversation, 50, 0).await;
        assert_eq!(all.len(), 3);
        let page = AgentMessageBus.get_conversation_messages(&uow, conversation, 1, 1).await;
        assert_eq!(page[0].body, "two");
    }

    #[tokio::test]
    async fn test_reply_uses_matching_type() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let (asker, expert) = (Uuid::new_v4(), Uuid::new_v4());
        let question = AgentMessageBus
            .send_message(
                &uow,
                OutgoingMessage::new(Uuid::new_v4(), asker, expert, "task_request", "do it")
                    .with_subject("Report"),
            )
            .await
            .unwrap();

        let reply = AgentMessageBus.send_reply(&uow, question.id, "done").await.unwrap();
        assert_eq!(reply.message_type, MessageType::TaskResult);
        assert_eq!(reply.to_agent_id, asker);
        assert_eq!(reply.subject, "Re: Report");
        assert_eq!(reply.metadata["in_reply_to"], question.id.to_string());

        assert!(AgentMessageBus.send_reply(&uow, Uuid::new_v4(), "?").await.is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_degrades_to_empty() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        uow.conn().execute_batch("DROP TABLE agent_messages;").unwrap();

        assert!(AgentMessageBus.get_pending_messages(&uow, Uuid::new_v4(), None).await.is_empty());
        assert!(!AgentMessageBus.mark_as_read(&uow, Uuid::new_v4()).await);
        let sent = AgentMessageBus
            .send_message(
                &uow,
                OutgoingMessage::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "feedback", "x"),
            )
            .await;
        assert!(sent.is_none());
    }
}
