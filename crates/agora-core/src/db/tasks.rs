//! Delegated task rows

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{
    enum_col, json_col, opt_ts_col, opt_ts_to_sql, opt_uuid_col, ts_col, ts_to_sql, u64_to_sql, uuid_col,
};
use crate::Result;
use crate::model::{AgentId, AgentTask, ConversationId, TaskId, TaskStatus};

const TASK_COLUMNS: &str = "id, conversation_id, title, description, status, priority, \
     assigned_to_agent_id, created_by_agent_id, parent_task_id, delegation_depth, result, error, \
     timeout_seconds, metadata, created_at, started_at, completed_at";

pub struct TaskStore<'a> {
    conn: &'a Connection,
}

impl<'a> TaskStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, task: &AgentTask) -> Result<()> {
        let timeout_seconds = u64_to_sql(task.timeout_seconds, "timeout_seconds")?;
        self.conn.execute(
            &format!(
                "INSERT INTO agent_tasks ({TASK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                task.id.to_string(),
                task.conversation_id.to_string(),
                task.title,
                task.description,
                task.status.as_str(),
                task.priority,
                task.assigned_to_agent_id.to_string(),
                task.created_by_agent_id.to_string(),
                task.parent_task_id.map(|id| id.to_string()),
                task.delegation_depth,
                task.result,
                task.error,
                timeout_seconds,
                serde_json::to_string(&task.metadata)?,
                ts_to_sql(&task.created_at),
                opt_ts_to_sql(&task.started_at),
                opt_ts_to_sql(&task.completed_at),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, task_id: TaskId) -> Result<Option<AgentTask>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM agent_tasks WHERE id = ?1"),
                params![task_id.to_string()],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Persist the mutable lifecycle fields of a task
    pub fn update(&self, task: &AgentTask) -> Result<()> {
        self.conn.execute(
            "UPDATE agent_tasks
             SET status = ?2, result = ?3, error = ?4, metadata = ?5, started_at = ?6, completed_at = ?7
             WHERE id = ?1",
            params![
                task.id.to_string(),
                task.status.as_str(),
                task.result,
                task.error,
                serde_json::to_string(&task.metadata)?,
                opt_ts_to_sql(&task.started_at),
                opt_ts_to_sql(&task.completed_at),
            ],
        )?;
        Ok(())
    }

    /// Pending tasks of an agent, most urgent first then oldest first
    pub fn pending_for_agent(
        &self,
        agent_id: AgentId,
        conversation_id: Option<ConversationId>,
        limit: usize,
    ) -> Result<Vec<AgentTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM agent_tasks
             WHERE assigned_to_agent_id = ?1
               AND status = ?2
               AND (?3 IS NULL OR conversation_id = ?3)
             ORDER BY priority ASC, created_at ASC, rowid ASC
             LIMIT ?4"
        ))?;
        let tasks = stmt
            .query_map(
                params![
                    agent_id.to_string(),
                    TaskStatus::Pending.as_str(),
                    conversation_id.map(|id| id.to_string()),
                    limit as i64,
                ],
                task_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn children(&self, parent_task_id: TaskId) -> Result<Vec<AgentTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM agent_tasks
             WHERE parent_task_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let tasks = stmt
            .query_map(params![parent_task_id.to_string()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<AgentTask> {
    let timeout: i64 = row.get(12)?;
    Ok(AgentTask {
        id: uuid_col(row, 0)?,
        conversation_id: uuid_col(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: enum_col(row, 4)?,
        priority: row.get(5)?,
        assigned_to_agent_id: uuid_col(row, 6)?,
        created_by_agent_id: uuid_col(row, 7)?,
        parent_task_id: opt_uuid_col(row, 8)?,
        delegation_depth: row.get(9)?,
        result: row.get(10)?,
        error: row.get(11)?,
        timeout_seconds: u64::try_from(timeout).unwrap_or(0),
        metadata: json_col(row, 13)?,
        created_at: ts_col(row, 14)?,
        started_at: opt_ts_col(row, 15)?,
        completed_at: opt_ts_col(row, 16)?,
    })
}
