//! Inter-agent mailbox rows

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{enum_col, json_col, opt_ts_col, ts_col, ts_to_sql, uuid_col};
use crate::Result;
use crate::model::{AgentId, AgentMessage, ConversationId, MessageId};

const MESSAGE_COLUMNS: &str = "id, conversation_id, from_agent_id, to_agent_id, message_type, \
     subject, body, metadata, created_at, read_at";

pub struct MessageStore<'a> {
    conn: &'a Connection,
}

impl<'a> MessageStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, message: &AgentMessage) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO agent_messages ({MESSAGE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                message.id.to_string(),
                message.conversation_id.to_string(),
                message.from_agent_id.to_string(),
                message.to_agent_id.to_string(),
                message.message_type.as_str(),
                message.subject,
                message.body,
                serde_json::to_string(&message.metadata)?,
                ts_to_sql(&message.created_at),
                message.read_at.as_ref().map(ts_to_sql),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, message_id: MessageId) -> Result<Option<AgentMessage>> {
        let message = self
            .conn
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM agent_messages WHERE id = ?1"),
                params![message_id.to_string()],
                message_from_row,
            )
            .optional()?;
        Ok(message)
    }

    /// Unread messages for a recipient, oldest first
    pub fn unread_for_agent(
        &self,
        agent_id: AgentId,
        conversation_id: Option<ConversationId>,
    ) -> Result<Vec<AgentMessage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM agent_messages
             WHERE to_agent_id = ?1
               AND read_at IS NULL
               AND (?2 IS NULL OR conversation_id = ?2)
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let messages = stmt
            .query_map(
                params![agent_id.to_string(), conversation_id.map(|id| id.to_string())],
                message_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    /// Stamp `read_at` on an unread message; false when nothing was unread
    pub fn mark_read(&self, message_id: MessageId, read_at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE agent_messages SET read_at = ?2 WHERE id = ?1 AND read_at IS NULL",
            params![message_id.to_string(), ts_to_sql(&read_at)],
        )?;
        Ok(changed == 1)
    }

    /// One chronological page of a conversation, read and unread alike
    pub fn for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AgentMessage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM agent_messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let messages = stmt
            .query_map(
                params![conversation_id.to_string(), limit as i64, offset as i64],
                message_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<AgentMessage> {
    Ok(AgentMessage {
        id: uuid_col(row, 0)?,
        conversation_id: uuid_col(row, 1)?,
        from_agent_id: uuid_col(row, 2)?,
        to_agent_id: uuid_col(row, 3)?,
        message_type: enum_col(row, 4)?,
        subject: row.get(5)?,
        body: row.get(6)?,
        metadata: json_col(row, 7)?,
        created_at: ts_col(row, 8)?,
        read_at: opt_ts_col(row, 9)?,
    })
}
