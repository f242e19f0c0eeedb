//! Inter-agent message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use super::{AgentId, ConversationId, MessageId};

/// Kind of an inter-agent message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    InfoRequest,
    InfoResponse,
    TaskRequest,
    TaskResult,
    Notification,
    Feedback,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InfoRequest => "info_request",
            Self::InfoResponse => "info_response",
            Self::TaskRequest => "task_request",
            Self::TaskResult => "task_result",
            Self::Notification => "notification",
            Self::Feedback => "feedback",
        }
    }

    /// Message type used when answering a message of this type
    pub fn reply_type(&self) -> Self {
        match self {
            Self::InfoRequest => Self::InfoResponse,
            Self::TaskRequest => Self::TaskResult,
            _ => Self::Notification,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info_request" => Ok(Self::InfoRequest),
            "info_response" => Ok(Self::InfoResponse),
            "task_request" => Ok(Self::TaskRequest),
            "task_result" => Ok(Self::TaskResult),
            "notification" => Ok(Self::Notification),
            "feedback" => Ok(Self::Feedback),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// A message sent between two agents within a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub from_agent_id: AgentId,
    pub to_agent_id: AgentId,
    pub message_type: MessageType,
    pub subject: String,
    pub body: String,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    /// `None` while unread
    pub read_at: Option<DateTime<Utc>>,
}

impl AgentMessage {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Input of `send_message`; the type is raw text validated by the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub conversation_id: ConversationId,
    pub from_agent_id: AgentId,
    pub to_agent_id: AgentId,
    pub message_type: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub metadata: JsonValue,
}

impl OutgoingMessage {
    pub fn new(
        conversation_id: ConversationId,
        from_agent_id: AgentId,
        to_agent_id: AgentId,
        message_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            from_agent_id,
            to_agent_id,
            message_type: message_type.into(),
            subject: String::new(),
            body: body.into(),
            metadata: JsonValue::Null,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_types() {
        assert_eq!(MessageType::InfoRequest.reply_type(), MessageType::InfoResponse);
        assert_eq!(MessageType::TaskRequest.reply_type(), MessageType::TaskResult);
        assert_eq!(MessageType::Feedback.reply_type(), MessageType::Notification);
    }

    #[test]
    fn test_unknown_message_type() {
        assert!("gossip".parse::<MessageType>().is_err());
        assert_eq!("notification".parse::<MessageType>().unwrap(), MessageType::Notification);
    }
}
