//! Handoff rows

use rusqlite::{Connection, Row, params};

use super::{json_col, ts_col, ts_to_sql, uuid_col};
use crate::Result;
use crate::model::{AgentHandoff, ConversationId};

pub struct HandoffStore<'a> {
    conn: &'a Connection,
}

impl<'a> HandoffStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Number of handoffs recorded for a conversation
    pub fn count_for_conversation(&self, conversation_id: ConversationId) -> Result<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM agent_handoffs WHERE conversation_id = ?1",
            params![conversation_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    pub fn insert(&self, handoff: &AgentHandoff) -> Result<()> {
        self.conn.execute(
            "INSERT INTO agent_handoffs
                (id, conversation_id, from_agent_id, to_agent_id, reason, context, handoff_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                handoff.id.to_string(),
                handoff.conversation_id.to_string(),
                handoff.from_agent_id.to_string(),
                handoff.to_agent_id.to_string(),
                handoff.reason,
                serde_json::to_string(&handoff.context)?,
                ts_to_sql(&handoff.handoff_at),
            ],
        )?;
        Ok(())
    }

    /// Most recent handoffs first
    pub fn recent(&self, conversation_id: ConversationId, limit: usize) -> Result<Vec<AgentHandoff>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, from_agent_id, to_agent_id, reason, context, handoff_at
             FROM agent_handoffs
             WHERE conversation_id = ?1
             ORDER BY handoff_at DESC, rowid DESC
             LIMIT ?2",
        )?;
        let handoffs = stmt
            .query_map(
                params![conversation_id.to_string(), limit as i64],
                handoff_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(handoffs)
    }
}

fn handoff_from_row(row: &Row<'_>) -> rusqlite::Result<AgentHandoff> {
    Ok(AgentHandoff {
        id: uuid_col(row, 0)?,
        conversation_id: uuid_col(row, 1)?,
        from_agent_id: uuid_col(row, 2)?,
        to_agent_id: uuid_col(row, 3)?,
        reason: row.get(4)?,
        context: json_col(row, 5)?,
        handoff_at: ts_col(row, 6)?,
    })
}
