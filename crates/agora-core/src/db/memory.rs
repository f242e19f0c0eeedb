//! Team memory repository
//!
//! [`MemoryRepository`] is the seam a vector service would implement.
//! [`SqliteMemoryRepository`] keeps embeddings as JSON text and scans them
//! with cosine similarity, which is adequate for team-sized corpora.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Row, ToSql, params, params_from_iter};
use tracing::debug;

use super::{UnitOfWork, enum_col, json_col, opt_uuid_col, ts_col, ts_to_sql, uuid_col};
use crate::Result;
use crate::model::{Memory, MemoryStatus, MemoryType, NewMemory, TeamId, cosine_similarity};

const MEMORY_COLUMNS: &str = "id, team_id, agent_id, memory_type, status, content, importance, \
     metadata, embedding, created_at";

/// Persistence contract for memories
#[async_trait(?Send)]
pub trait MemoryRepository: Send + Sync {
    /// Persist a memory
    async fn create(&self, uow: &UnitOfWork<'_>, memory: NewMemory) -> Result<Memory>;

    /// Active team memories whose embedding has cosine similarity >= `threshold`,
    /// most similar first
    async fn find_similar(
        &self,
        uow: &UnitOfWork<'_>,
        embedding: &[f32],
        team_id: TeamId,
        threshold: f32,
    ) -> Result<Vec<(Memory, f32)>>;

    /// Page of team memories, newest first; empty `memory_types` means any type
    async fn get_by_team(
        &self,
        uow: &UnitOfWork<'_>,
        team_id: TeamId,
        memory_types: &[MemoryType],
        status: MemoryStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Memory>>;
}

/// [`MemoryRepository`] backed by the `memories` table
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteMemoryRepository;

impl SqliteMemoryRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl MemoryRepository for SqliteMemoryRepository {
    async fn create(&self, uow: &UnitOfWork<'_>, memory: NewMemory) -> Result<Memory> {
        let memory = Memory {
            id: uuid::Uuid::new_v4(),
            team_id: memory.team_id,
            agent_id: memory.agent_id,
            memory_type: memory.memory_type,
            status: MemoryStatus::Active,
            content: memory.content,
            importance: memory.importance,
            metadata: memory.metadata,
            embedding: memory.embedding,
            created_at: Utc::now(),
        };

        let embedding = memory
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        uow.conn().execute(
            &format!(
                "INSERT INTO memories ({MEMORY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                memory.id.to_string(),
                memory.team_id.to_string(),
                memory.agent_id.map(|id| id.to_string()),
                memory.memory_type.as_str(),
                memory.status.as_str(),
                memory.content,
                memory.importance as f64,
                serde_json::to_string(&memory.metadata)?,
                embedding,
                ts_to_sql(&memory.created_at),
            ],
        )?;

        debug!("Saved memory {} for team {}", memory.id, memory.team_id);
        Ok(memory)
    }

    async fn find_similar(
        &self,
        uow: &UnitOfWork<'_>,
        embedding: &[f32],
        team_id: TeamId,
        threshold: f32,
    ) -> Result<Vec<(Memory, f32)>> {
        let mut stmt = uow.conn().prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories
             WHERE team_id = ?1 AND status = ?2 AND embedding IS NOT NULL"
        ))?;
        let candidates = stmt
            .query_map(
                params![team_id.to_string(), MemoryStatus::Active.as_str()],
                memory_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut matches: Vec<(Memory, f32)> = candidates
            .into_iter()
            .filter_map(|memory| {
                let score = memory
                    .embedding
                    .as_deref()
                    .map(|stored| cosine_similarity(stored, embedding))?;
                (score >= threshold).then_some((memory, score))
            })
            .collect();
        matches.sort_by(|a, b| b.1.total_cmp(&a.1));

        debug!("Found {} similar memories for team {}", matches.len(), team_id);
        Ok(matches)
    }

    async fn get_by_team(
        &self,
        uow: &UnitOfWork<'_>,
        team_id: TeamId,
        memory_types: &[MemoryType],
        status: MemoryStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Memory>> {
        let mut values: Vec<Box<dyn ToSql>> = vec![
            Box::new(team_id.to_string()),
            Box::new(status.as_str()),
        ];
        let mut type_clause = String::new();
        if !memory_types.is_empty() {
            let placeholders: Vec<String> = memory_types
                .iter()
                .map(|t| {
                    values.push(Box::new(t.as_str()));
                    format!("?{}", values.len())
                })
                .collect();
            type_clause = format!("AND memory_type IN ({})", placeholders.join(", "));
        }
        values.push(Box::new(limit as i64));
        let limit_idx = values.len();
        values.push(Box::new(offset as i64));
        let offset_idx = values.len();

        let mut stmt = uow.conn().prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories
             WHERE team_id = ?1 AND status = ?2 {type_clause}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        ))?;
        let memories = stmt
            .query_map(params_from_iter(values.iter()), memory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }
}

fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let importance: f64 = row.get(6)?;
    Ok(Memory {
        id: uuid_col(row, 0)?,
        team_id: uuid_col(row, 1)?,
        agent_id: opt_uuid_col(row, 2)?,
        memory_type: enum_col(row, 3)?,
        status: enum_col(row, 4)?,
        content: row.get(5)?,
        importance: importance as f32,
        metadata: json_col(row, 7)?,
        embedding: json_col(row, 8)?,
        created_at: ts_col(row, 9)?,
    })
}
