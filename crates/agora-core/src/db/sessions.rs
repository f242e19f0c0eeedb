//! Collaboration sessions, participants and stage outputs

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use super::{
    enum_col, json_col, opt_enum_col, opt_ts_col, opt_ts_to_sql, ts_col, ts_to_sql, u64_to_sql, uuid_col,
};
use crate::model::{
    AgentId, CollaborationParticipant, CollaborationSession, ConversationId, SessionId,
    StageOutput,
};
use crate::{Error, Result};

const SESSION_COLUMNS: &str = "id, conversation_id, pattern, goal, status, total_cost, \
     total_duration_ms, metadata, started_at, completed_at, final_result";

pub struct SessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SessionStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert the session row and any stage outputs it already carries
    pub fn insert(&self, session: &CollaborationSession) -> Result<()> {
        let total_duration_ms = u64_to_sql(session.total_duration_ms, "total_duration_ms")?;
        self.conn.execute(
            &format!(
                "INSERT INTO collaboration_sessions ({SESSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                session.id.to_string(),
                session.conversation_id.to_string(),
                session.pattern.map(|p| p.as_str()),
                session.goal,
                session.status.as_str(),
                session.total_cost,
                total_duration_ms,
                serde_json::to_string(&session.metadata)?,
                ts_to_sql(&session.started_at),
                opt_ts_to_sql(&session.completed_at),
                session.final_result,
            ],
        )?;
        for stage in &session.stage_outputs {
            self.append_stage(session.id, stage)?;
        }
        Ok(())
    }

    /// Load a session with its stage outputs in execution order
    pub fn get(&self, session_id: SessionId) -> Result<Option<CollaborationSession>> {
        let session = self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM collaboration_sessions WHERE id = ?1"),
                params![session_id.to_string()],
                session_from_row,
            )
            .optional()?;

        match session {
            Some(mut session) => {
                session.stage_outputs = self.stages(session_id)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Persist status, accounting and result fields; stages are append-only
    pub fn update(&self, session: &CollaborationSession) -> Result<()> {
        let total_duration_ms = u64_to_sql(session.total_duration_ms, "total_duration_ms")?;
        self.conn.execute(
            "UPDATE collaboration_sessions
             SET status = ?2, total_cost = ?3, total_duration_ms = ?4, metadata = ?5,
                 completed_at = ?6, final_result = ?7
             WHERE id = ?1",
            params![
                session.id.to_string(),
                session.status.as_str(),
                session.total_cost,
                total_duration_ms,
                serde_json::to_string(&session.metadata)?,
                opt_ts_to_sql(&session.completed_at),
                session.final_result,
            ],
        )?;
        Ok(())
    }

    /// Sessions of a conversation, oldest first (without stage outputs)
    pub fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<CollaborationSession>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM collaboration_sessions
             WHERE conversation_id = ?1
             ORDER BY started_at ASC, rowid ASC"
        ))?;
        let sessions = stmt
            .query_map(params![conversation_id.to_string()], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Append a stage output; returns its sequence number
    pub fn append_stage(&self, session_id: SessionId, stage: &StageOutput) -> Result<u32> {
        let seq: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM collaboration_stages WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO collaboration_stages (session_id, seq, stage, agent_id, output, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id.to_string(),
                seq,
                stage.stage,
                stage.agent_id.to_string(),
                stage.output,
                ts_to_sql(&stage.completed_at),
            ],
        )?;
        Ok(seq)
    }

    pub fn stages(&self, session_id: SessionId) -> Result<Vec<StageOutput>> {
        let mut stmt = self.conn.prepare(
            "SELECT stage, agent_id, output, completed_at FROM collaboration_stages
             WHERE session_id = ?1
             ORDER BY seq ASC",
        )?;
        let stages = stmt
            .query_map(params![session_id.to_string()], |row| {
                Ok(StageOutput {
                    stage: row.get(0)?,
                    agent_id: uuid_col(row, 1)?,
                    output: row.get(2)?,
                    completed_at: ts_col(row, 3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stages)
    }

    /// Insert a participant; a repeated (session, agent) pair is [`Error::DuplicateParticipant`]
    pub fn insert_participant(&self, participant: &CollaborationParticipant) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO collaboration_participants
                (session_id, agent_id, role, contribution, turn_count, cost, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                participant.session_id.to_string(),
                participant.agent_id.to_string(),
                participant.role.as_str(),
                participant.contribution,
                participant.turn_count,
                participant.cost,
                ts_to_sql(&participant.joined_at),
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(Error::DuplicateParticipant {
                    session_id: participant.session_id,
                    agent_id: participant.agent_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Participants in join order
    pub fn participants(&self, session_id: SessionId) -> Result<Vec<CollaborationParticipant>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, agent_id, role, contribution, turn_count, cost, joined_at
             FROM collaboration_participants
             WHERE session_id = ?1
             ORDER BY joined_at ASC, rowid ASC",
        )?;
        let participants = stmt
            .query_map(params![session_id.to_string()], participant_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(participants)
    }

    /// Add to the accumulated cost of a session
    pub fn add_cost(&self, session_id: SessionId, cost: f64) -> Result<()> {
        self.conn.execute(
            "UPDATE collaboration_sessions SET total_cost = total_cost + ?2 WHERE id = ?1",
            params![session_id.to_string(), cost],
        )?;
        Ok(())
    }

    /// Add one turn and its cost to a participant; false when the pair is unknown
    pub fn record_turn(
        &self,
        session_id: SessionId,
        agent_id: AgentId,
        contribution: &str,
        cost: f64,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE collaboration_participants
             SET turn_count = turn_count + 1, cost = cost + ?3, contribution = ?4
             WHERE session_id = ?1 AND agent_id = ?2",
            params![session_id.to_string(), agent_id.to_string(), cost, contribution],
        )?;
        Ok(changed == 1)
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<CollaborationSession> {
    let duration: i64 = row.get(6)?;

    Ok(CollaborationSession {
        id: uuid_col(row, 0)?,
        conversation_id: uuid_col(row, 1)?,
        pattern: opt_enum_col(row, 2)?,
        goal: row.get(3)?,
        status: enum_col(row, 4)?,
        stage_outputs: Vec::new(),
        total_cost: row.get(5)?,
        total_duration_ms: u64::try_from(duration).unwrap_or(0),
        metadata: json_col(row, 7)?,
        started_at: ts_col(row, 8)?,
        completed_at: opt_ts_col(row, 9)?,
        final_result: row.get(10)?,
    })
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<CollaborationParticipant> {
    Ok(CollaborationParticipant {
        session_id: uuid_col(row, 0)?,
        agent_id: uuid_col(row, 1)?,
        role: enum_col(row, 2)?,
        contribution: row.get(3)?,
        turn_count: row.get(4)?,
        cost: row.get(5)?,
        joined_at: ts_col(row, 6)?,
    })
}
