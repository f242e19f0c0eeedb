//! Team-scoped knowledge sharing

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use agora_core::model::{
    AgentId, Memory, MemoryStatus, MemorySummary, MemoryType, NewMemory, SessionId, TeamId,
};
use agora_core::{CollaborationSettings, MemoryRepository, Result, UnitOfWork};

/// Live payload fanned out to the participants of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBroadcast {
    pub team_id: TeamId,
    pub agent_id: Option<AgentId>,
    pub session_id: Option<SessionId>,
    pub content: String,
    pub metadata: JsonValue,
    pub published_at: DateTime<Utc>,
}

/// Knowledge to keep for a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamKnowledge {
    pub team_id: TeamId,
    pub agent_id: Option<AgentId>,
    pub content: String,
    #[serde(default = "default_importance")]
    pub importance: f32,
    #[serde(default)]
    pub metadata: JsonValue,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

fn default_importance() -> f32 {
    0.5
}

impl TeamKnowledge {
    pub fn new(team_id: TeamId, content: impl Into<String>) -> Self {
        Self {
            team_id,
            agent_id: None,
            content: content.into(),
            importance: default_importance(),
            metadata: JsonValue::Null,
            embedding: None,
        }
    }

    pub fn from_agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

pub struct TeamMemoryBus {
    repository: Arc<dyn MemoryRepository>,
    dedup_threshold: f32,
}

impl TeamMemoryBus {
    pub fn new(repository: Arc<dyn MemoryRepository>, settings: CollaborationSettings) -> Self {
        Self {
            repository,
            dedup_threshold: settings.dedup_threshold,
        }
    }

    /// Build the broadcast payload; nothing is stored
    pub fn publish_to_team(
        &self,
        team_id: TeamId,
        agent_id: Option<AgentId>,
        session_id: Option<SessionId>,
        content: impl Into<String>,
        metadata: JsonValue,
    ) -> TeamBroadcast {
        let broadcast = TeamBroadcast {
            team_id,
            agent_id,
            session_id,
            content: content.into(),
            metadata,
            published_at: Utc::now(),
        };
        debug!(team_id = %team_id, "Prepared team broadcast");
        broadcast
    }

    /// Store knowledge unless a near-identical memory already exists
    ///
    /// A duplicate yields an empty list. When the similarity search itself
    /// fails the knowledge is stored anyway.
    pub async fn store_team_knowledge(
        &self,
        uow: &UnitOfWork<'_>,
        knowledge: TeamKnowledge,
    ) -> Result<Vec<MemorySummary>> {
        if let Some(embedding) = knowledge.embedding.as_deref() {
            match self
                .repository
                .find_similar(uow, embedding, knowledge.team_id, self.dedup_threshold)
                .await
            {
                Ok(similar) if !similar.is_empty() => {
                    debug!(
                        team_id = %knowledge.team_id,
                        "Skipping duplicate team knowledge (similarity {:.3})",
                        similar[0].1
                    );
                    return Ok(Vec::new());
                }
                Ok(_) => {}
                Err(e) => warn!("Similarity search failed, storing without dedup: {}", e),
            }
        }

        let memory = self
            .repository
            .create(
                uow,
                NewMemory {
                    team_id: knowledge.team_id,
                    agent_id: knowledge.agent_id,
                    memory_type: MemoryType::TeamShared,
                    content: knowledge.content,
                    importance: knowledge.importance,
                    metadata: knowledge.metadata,
                    embedding: knowledge.embedding,
                },
            )
            .await?;

        info!(team_id = %memory.team_id, memory_id = %memory.id, "Stored team knowledge");
        Ok(vec![MemorySummary::from(&memory)])
    }

    /// Active team-shared memories, newest first
    pub async fn retrieve_team_context(
        &self,
        uow: &UnitOfWork<'_>,
        team_id: TeamId,
        limit: usize,
    ) -> Result<Vec<Memory>> {
        self.repository
            .get_by_team(uow, team_id, &[MemoryType::TeamShared], MemoryStatus::Active, limit, 0)
            .await
    }

    /// Render memories as a prompt preamble; empty input renders as ""
    pub fn format_team_context(&self, memories: &[Memory]) -> String {
        if memories.is_empty() {
            return String::new();
        }

        let mut text = String::from("Team knowledge:\n");
        for memory in memories {
            text.push_str("- ");
            text.push_str(&memory.content);
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Database, Error, SqliteMemoryRepository};
    use async_trait::async_trait;
    use uuid::Uuid;

    fn bus() -> TeamMemoryBus {
        TeamMemoryBus::new(Arc::new(SqliteMemoryRepository::new()), CollaborationSettings::default())
    }

    /// Repository whose similarity search is unavailable
    struct NoSearch(SqliteMemoryRepository);

    #[async_trait(?Send)]
    impl MemoryRepository for NoSearch {
        async fn create(&self, uow: &UnitOfWork<'_>, memory: NewMemory) -> Result<Memory> {
            self.0.create(uow, memory).await
        }

        async fn find_similar(
            &self,
            _uow: &UnitOfWork<'_>,
            _embedding: &[f32],
            _team_id: TeamId,
            _threshold: f32,
        ) -> Result<Vec<(Memory, f32)>> {
            Err(Error::Other("vector index offline".into()))
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
            self.0.get_by_team(uow, team_id, memory_types, status, limit, offset).await
        }
    }

    fn team_rows(uow: &UnitOfWork<'_>, team: TeamId) -> i64 {
        uow.conn()
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE team_id = ?1",
                [team.to_string()],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_near_duplicate_is_skipped() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = Uuid::new_v4();

        let first = bus()
            .store_team_knowledge(
                &uow,
                TeamKnowledge::new(team, "Deploys happen on Tuesdays").with_embedding(vec![0.6, 0.8, 0.0]),
            )
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].memory_type, MemoryType::TeamShared);

        let second = bus()
            .store_team_knowledge(
                &uow,
                TeamKnowledge::new(team, "We deploy every Tuesday").with_embedding(vec![0.61, 0.79, 0.01]),
            )
            .await
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(team_rows(&uow, team), 1);
    }

    #[tokio::test]
    async fn test_distinct_knowledge_is_kept() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = Uuid::new_v4();

        for (content, embedding) in [("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])] {
            let stored = bus()
                .store_team_knowledge(&uow, TeamKnowledge::new(team, content).with_embedding(embedding))
                .await
                .unwrap();
            assert_eq!(stored.len(), 1);
        }
        bus()
            .store_team_knowledge(&uow, TeamKnowledge::new(team, "no embedding"))
            .await
            .unwrap();
        assert_eq!(team_rows(&uow, team), 3);
    }

    #[tokio::test]
    async fn test_search_failure_still_stores() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = Uuid::new_v4();
        let bus = TeamMemoryBus::new(
            Arc::new(NoSearch(SqliteMemoryRepository::new())),
            CollaborationSettings::default(),
        );

        for _ in 0..2 {
            let stored = bus
                .store_team_knowledge(&uow, TeamKnowledge::new(team, "same").with_embedding(vec![1.0, 0.0]))
                .await
                .unwrap();
            assert_eq!(stored.len(), 1);
        }
        assert_eq!(team_rows(&uow, team), 2);
    }

    #[tokio::test]
    async fn test_retrieve_and_format_context() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = Uuid::new_v4();
        bus()
            .store_team_knowledge(&uow, TeamKnowledge::new(team, "Use UTC everywhere"))
            .await
            .unwrap();
        SqliteMemoryRepository::new()
            .create(&uow, NewMemory::new(team, MemoryType::Agent, "private note"))
            .await
            .unwrap();

        let context = bus().retrieve_team_context(&uow, team, 50).await.unwrap();
        assert_eq!(context.len(), 1);
        assert_eq!(bus().format_team_context(&context), "Team knowledge:\n- Use UTC everywhere\n");
        assert_eq!(bus().format_team_context(&[]), "");
    }

    #[test]
    fn test_publish_builds_payload_only() {
        let team = Uuid::new_v4();
        let session = Uuid::new_v4();
        let broadcast = bus().publish_to_team(team, None, Some(session), "Standup moved", JsonValue::Null);
        assert_eq!(broadcast.team_id, team);
        assert_eq!(broadcast.session_id, Some(session));
        assert_eq!(broadcast.content, "Standup moved");
    }
}
