//! Agent catalog queries

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::{enum_col, json_col, ts_col, ts_to_sql, uuid_col};
use crate::Result;
use crate::model::{AgentId, AgentRecord, TeamId, UserId};

const AGENT_COLUMNS: &str = "id, team_id, name, tagline, shared_skills, custom_skills, \
     disabled_skills, personality, model_config, boundaries, status, avg_response_ms, \
     created_at, updated_at";

/// Read/write access to teams, memberships and agents
pub struct AgentStore<'a> {
    conn: &'a Connection,
}

impl<'a> AgentStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert_team(&self, team_id: TeamId, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO teams (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![team_id.to_string(), name, ts_to_sql(&Utc::now())],
        )?;
        Ok(())
    }

    pub fn add_member(&self, team_id: TeamId, user_id: UserId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO team_members (team_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![team_id.to_string(), user_id.to_string(), ts_to_sql(&Utc::now())],
        )?;
        Ok(())
    }

    pub fn insert(&self, agent: &AgentRecord) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO agents ({AGENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
            params![
                agent.id.to_string(),
                agent.team_id.to_string(),
                agent.name,
                agent.tagline,
                serde_json::to_string(&agent.shared_skills)?,
                serde_json::to_string(&agent.custom_skills)?,
                serde_json::to_string(&agent.disabled_skills)?,
                serde_json::to_string(&agent.personality)?,
                serde_json::to_string(&agent.model_config)?,
                serde_json::to_string(&agent.boundaries)?,
                agent.status.as_str(),
                agent.avg_response_ms,
                ts_to_sql(&agent.created_at),
                ts_to_sql(&agent.updated_at),
            ],
        )?;
        debug!("Saved agent {} ({})", agent.name, agent.id);
        Ok(())
    }

    pub fn get(&self, agent_id: AgentId) -> Result<Option<AgentRecord>> {
        let agent = self
            .conn
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![agent_id.to_string()],
                agent_from_row,
            )
            .optional()?;
        Ok(agent)
    }

    /// Active agents of one team in creation order
    pub fn active_for_team(&self, team_id: TeamId) -> Result<Vec<AgentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents
             WHERE team_id = ?1 AND status = 'active'
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let agents = stmt
            .query_map(params![team_id.to_string()], agent_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(agents)
    }

    /// Active agents across every team the user belongs to, in creation order
    pub fn active_for_user(&self, user_id: UserId) -> Result<Vec<AgentRecord>> {
        let columns = AGENT_COLUMNS
            .split(", ")
            .map(|c| format!("a.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {columns} FROM agents a
             JOIN team_members m ON m.team_id = a.team_id
             WHERE m.user_id = ?1 AND a.status = 'active'
             ORDER BY a.created_at ASC, a.rowid ASC"
        ))?;
        let agents = stmt
            .query_map(params![user_id.to_string()], agent_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(agents)
    }
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: uuid_col(row, 0)?,
        team_id: uuid_col(row, 1)?,
        name: row.get(2)?,
        tagline: row.get(3)?,
        shared_skills: json_col(row, 4)?,
        custom_skills: json_col(row, 5)?,
        disabled_skills: json_col(row, 6)?,
        personality: json_col(row, 7)?,
        model_config: json_col(row, 8)?,
        boundaries: json_col(row, 9)?,
        status: enum_col(row, 10)?,
        avg_response_ms: row.get(11)?,
        created_at: ts_col(row, 12)?,
        updated_at: ts_col(row, 13)?,
    })
}
