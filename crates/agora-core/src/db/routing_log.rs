//! Append-only routing decision log

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, ToSql, params, params_from_iter};

use super::{enum_col, json_col, opt_uuid_col, ts_col, ts_to_sql, u64_to_sql, uuid_col};
use crate::Result;
use crate::model::{NewRoutingLog, RoutingDecisionLog, RoutingHistoryFilter};

const LOG_COLUMNS: &str = "id, conversation_id, user_message, selected_agent_id, scores, \
     confidence, strategy, latency_ms, created_at";

pub struct RoutingLogStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoutingLogStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append one decision; rows are never updated
    pub fn append(&self, entry: NewRoutingLog) -> Result<RoutingDecisionLog> {
        let log = RoutingDecisionLog {
            id: uuid::Uuid::new_v4(),
            conversation_id: entry.conversation_id,
            user_message: entry.user_message,
            selected_agent_id: entry.selected_agent_id,
            scores: entry.scores,
            confidence: entry.confidence,
            strategy: entry.strategy,
            latency_ms: entry.latency_ms,
            created_at: Utc::now(),
        };

        let latency_ms = u64_to_sql(log.latency_ms, "latency_ms")?;
        self.conn.execute(
            &format!(
                "INSERT INTO routing_decision_logs ({LOG_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                log.id.to_string(),
                log.conversation_id.map(|id| id.to_string()),
                log.user_message,
                log.selected_agent_id.to_string(),
                serde_json::to_string(&log.scores)?,
                log.confidence,
                log.strategy.as_str(),
                latency_ms,
                ts_to_sql(&log.created_at),
            ],
        )?;
        Ok(log)
    }

    /// Filtered history, newest first
    pub fn history(&self, filter: &RoutingHistoryFilter) -> Result<Vec<RoutingDecisionLog>> {
        let mut clauses = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(conversation_id) = filter.conversation_id {
            values.push(Box::new(conversation_id.to_string()));
            clauses.push(format!("conversation_id = ?{}", values.len()));
        }
        if let Some(agent_id) = filter.agent_id {
            values.push(Box::new(agent_id.to_string()));
            clauses.push(format!("selected_agent_id = ?{}", values.len()));
        }
        if let Some(since) = filter.since {
            values.push(Box::new(ts_to_sql(&since)));
            clauses.push(format!("created_at >= ?{}", values.len()));
        }
        values.push(Box::new(filter.limit as i64));
        let limit_idx = values.len();

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM routing_decision_logs
             {where_clause}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?{limit_idx}"
        ))?;
        let logs = stmt
            .query_map(params_from_iter(values.iter()), log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// Every decision at or after `cutoff`, oldest first
    pub fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<RoutingDecisionLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM routing_decision_logs
             WHERE created_at >= ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let logs = stmt
            .query_map(params![ts_to_sql(&cutoff)], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<RoutingDecisionLog> {
    let latency: i64 = row.get(7)?;
    Ok(RoutingDecisionLog {
        id: uuid_col(row, 0)?,
        conversation_id: opt_uuid_col(row, 1)?,
        user_message: row.get(2)?,
        selected_agent_id: uuid_col(row, 3)?,
        scores: json_col(row, 4)?,
        confidence: row.get(5)?,
        strategy: enum_col(row, 6)?,
        latency_ms: u64::try_from(latency).unwrap_or(0),
        created_at: ts_col(row, 8)?,
    })
}
