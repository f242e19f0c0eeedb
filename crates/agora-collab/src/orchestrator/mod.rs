//! Pattern-driven multi-agent collaboration
//!
//! ```text
//!  CreateSessionRequest
//!         │
//!         ▼
//!  MultiAgentManager ── create session, add participants
//!         │
//!         ▼
//!  execute_pattern ──► supervisor_worker | pipeline | peer_review
//!         │            brainstorm | consensus | delegation
//!         ▼
//!  session COMPLETED with the handler result, or FAILED with the error text
//! ```
//!
//! Handlers return soft failures (a missing role, a dependency cycle) as an
//! `"Error: ..."` result, which still completes the session. Only a returned
//! [`Error`] fails it.

mod patterns;
mod pipeline;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use agora_core::model::{
    AgentId, CollaborationPattern, CollaborationSession, ConversationId, CreateSessionRequest,
    HandoffRequest, ParticipantConfig, ParticipantRole, SessionId, SessionStatus, StageOutput,
    StatusUpdateRequest,
};
use agora_core::{CollaborationSettings, Error, MemoryRepository, Result, UnitOfWork};

use crate::delegation::DelegationManager;
use crate::executor::TaskExecutor;
use crate::handoff::HandoffManager;
use crate::message_bus::AgentMessageBus;
use crate::multi_agent::MultiAgentManager;
use crate::runner::{AgentRun, AgentRunner};
use crate::team_memory::TeamMemoryBus;

/// Team memories loaded as onboarding context for a session
const TEAM_CONTEXT_LIMIT: usize = 50;

/// Inputs shared by every step of one pattern execution
struct PatternRun<'s> {
    session_id: SessionId,
    conversation_id: ConversationId,
    goal: &'s str,
    participants: &'s [ParticipantConfig],
    team_context: &'s str,
}

impl<'s> PatternRun<'s> {
    fn with_role(&self, role: ParticipantRole) -> Vec<&'s ParticipantConfig> {
        self.participants.iter().filter(|p| p.role == role).collect()
    }

    /// Everyone except observers
    fn acting(&self) -> Vec<&'s ParticipantConfig> {
        self.participants
            .iter()
            .filter(|p| p.role != ParticipantRole::Observer)
            .collect()
    }

    fn instructions<'a>(&'a self, participant: &'a ParticipantConfig) -> &'a str {
        if participant.instructions.is_empty() {
            self.goal
        } else {
            &participant.instructions
        }
    }
}

pub struct CollaborationOrchestrator {
    sessions: MultiAgentManager,
    handoffs: HandoffManager,
    delegations: DelegationManager,
    executor: TaskExecutor,
    messages: AgentMessageBus,
    team_memory: TeamMemoryBus,
    runner: Arc<dyn AgentRunner>,
}

impl CollaborationOrchestrator {
    pub fn new(
        settings: CollaborationSettings,
        memory: Arc<dyn MemoryRepository>,
        runner: Arc<dyn AgentRunner>,
    ) -> Self {
        Self {
            sessions: MultiAgentManager::new(),
            handoffs: HandoffManager::new(settings),
            delegations: DelegationManager::new(settings),
            executor: TaskExecutor::new(),
            messages: AgentMessageBus::new(),
            team_memory: TeamMemoryBus::new(memory, settings),
            runner,
        }
    }

    /// Run a collaboration end to end; the returned session is always terminal
    ///
    /// Only a failure to persist the final status escapes as an error.
    pub async fn orchestrate_collaboration(
        &self,
        uow: &UnitOfWork<'_>,
        request: CreateSessionRequest,
    ) -> Result<CollaborationSession> {
        let session = self
            .sessions
            .create_collaboration(uow, request.conversation_id, &request.pattern, &request.goal)
            .await?;
        if session.status.is_terminal() {
            return Ok(session);
        }

        let update = match self.drive(uow, &session, &request).await {
            Ok(final_result) => StatusUpdateRequest {
                status: SessionStatus::Completed,
                final_result: Some(final_result),
            },
            Err(e) => {
                error!(session_id = %session.id, "Collaboration failed: {}", e);
                StatusUpdateRequest {
                    status: SessionStatus::Failed,
                    final_result: Some(e.to_string()),
                }
            }
        };

        let finished = self
            .sessions
            .update_session_status(uow, session.id, update)
            .await?
            .map_err(|rejection| Error::InvalidData(rejection.message))?;

        info!(
            session_id = %finished.id,
            stages = finished.stage_outputs.len(),
            "Collaboration finished with status {}",
            finished.status
        );
        Ok(finished)
    }

    async fn drive(
        &self,
        uow: &UnitOfWork<'_>,
        session: &CollaborationSession,
        request: &CreateSessionRequest,
    ) -> Result<String> {
        self.sessions
            .add_participants(uow, session.id, &request.participants)
            .await?
            .map_err(|rejection| Error::InvalidData(rejection.message))?;

        let team_context = match request.team_id {
            Some(team_id) => match self
                .team_memory
                .retrieve_team_context(uow, team_id, TEAM_CONTEXT_LIMIT)
                .await
            {
                Ok(memories) => self.team_memory.format_team_context(&memories),
                Err(e) => {
                    warn!(team_id = %team_id, "Team context unavailable: {}", e);
                    String::new()
                }
            },
            None => String::new(),
        };

        self.execute_pattern(uow, session, &request.participants, &team_context)
            .await
    }

    /// Dispatch to the handler of the session's pattern
    ///
    /// A session without a pattern is a caller bug and returns
    /// [`Error::InvalidPattern`].
    pub async fn execute_pattern(
        &self,
        uow: &UnitOfWork<'_>,
        session: &CollaborationSession,
        participants: &[ParticipantConfig],
        team_context: &str,
    ) -> Result<String> {
        let Some(pattern) = session.pattern else {
            return Err(Error::InvalidPattern(format!(
                "session {} has no collaboration pattern",
                session.id
            )));
        };

        let run = PatternRun {
            session_id: session.id,
            conversation_id: session.conversation_id,
            goal: &session.goal,
            participants,
            team_context,
        };

        debug!(session_id = %session.id, "Executing {} pattern", pattern);
        match pattern {
            CollaborationPattern::SupervisorWorker => self.supervisor_worker(uow, &run).await,
            CollaborationPattern::Pipeline => self.pipeline(uow, &run).await,
            CollaborationPattern::PeerReview => self.peer_review(uow, &run).await,
            CollaborationPattern::Brainstorm => self.brainstorm(uow, &run).await,
            CollaborationPattern::Consensus => self.consensus(uow, &run).await,
            CollaborationPattern::Delegation => self.delegation(uow, &run).await,
        }
    }

    /// Record a transition between two agents as a handoff
    ///
    /// A refused handoff is logged and reported as `false`; the caller carries on.
    pub async fn coordinate_agents(
        &self,
        uow: &UnitOfWork<'_>,
        conversation_id: ConversationId,
        from_agent_id: AgentId,
        to_agent_id: AgentId,
        reason: &str,
    ) -> Result<bool> {
        let result = self
            .handoffs
            .initiate_handoff(
                uow,
                HandoffRequest::new(conversation_id, from_agent_id, to_agent_id, reason),
            )
            .await?;

        if !result.success {
            warn!(
                conversation_id = %conversation_id,
                "Continuing without a recorded handoff: {}",
                result.reason
            );
        }
        Ok(result.success)
    }

    /// Ask an agent, with the team context in front of the prompt
    async fn invoke(&self, run: &PatternRun<'_>, agent_id: AgentId, prompt: &str) -> Result<AgentRun> {
        if run.team_context.is_empty() {
            self.runner.run(agent_id, prompt).await
        } else {
            let prompt = format!("{}\n{}", run.team_context, prompt);
            self.runner.run(agent_id, &prompt).await
        }
    }

    async fn record_turn(
        &self,
        uow: &UnitOfWork<'_>,
        run: &PatternRun<'_>,
        agent_id: AgentId,
        contribution: &str,
        cost: f64,
    ) -> Result<()> {
        let recorded = self
            .sessions
            .record_participant_turn(uow, run.session_id, agent_id, contribution, cost)
            .await?;
        if !recorded {
            debug!(session_id = %run.session_id, "Agent {} is not on the roster", agent_id);
        }
        Ok(())
    }

    async fn record_stage(
        &self,
        uow: &UnitOfWork<'_>,
        run: &PatternRun<'_>,
        stage: &str,
        agent_id: AgentId,
        output: &str,
    ) -> Result<()> {
        self.sessions
            .record_stage(uow, run.session_id, &StageOutput::new(stage, agent_id, output))
            .await?;
        Ok(())
    }

    /// Invoke an agent and record its turn as one stage
    async fn consult(
        &self,
        uow: &UnitOfWork<'_>,
        run: &PatternRun<'_>,
        stage: &str,
        agent_id: AgentId,
        prompt: &str,
    ) -> Result<String> {
        let output = self.invoke(run, agent_id, prompt).await?;
        self.record_turn(uow, run, agent_id, &output.text, output.cost).await?;
        self.record_stage(uow, run, stage, agent_id, &output.text).await?;
        Ok(output.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{SimulatedRunner, TokenUsage};
    use crate::team_memory::TeamKnowledge;
    use agora_core::model::{AgentHandoff, TaskStatus};
    use agora_core::{Database, SqliteMemoryRepository};
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    fn orchestrator_with(runner: Arc<dyn AgentRunner>) -> CollaborationOrchestrator {
        CollaborationOrchestrator::new(
            CollaborationSettings::default(),
            Arc::new(SqliteMemoryRepository::new()),
            runner,
        )
    }

    fn orchestrator() -> CollaborationOrchestrator {
        orchestrator_with(Arc::new(SimulatedRunner))
    }

    fn request(pattern: &str, participants: Vec<ParticipantConfig>) -> CreateSessionRequest {
        CreateSessionRequest {
            conversation_id: Uuid::new_v4(),
            pattern: pattern.to_string(),
            goal: "Ship the quarterly report".to_string(),
            team_id: None,
            participants,
        }
    }

    fn stage_names(session: &CollaborationSession) -> Vec<&str> {
        session.stage_outputs.iter().map(|s| s.stage.as_str()).collect()
    }

    struct FailingRunner;

    #[async_trait]
    impl AgentRunner for FailingRunner {
        async fn run(&self, _agent_id: AgentId, _prompt: &str) -> Result<AgentRun> {
            Err(Error::Runner("model unavailable".into()))
        }
    }

    struct PricedRunner;

    #[async_trait]
    impl AgentRunner for PricedRunner {
        async fn run(&self, agent_id: AgentId, _prompt: &str) -> Result<AgentRun> {
            Ok(AgentRun {
                text: format!("idea from {}", agent_id),
                usage: TokenUsage::default(),
                cost: 0.1,
            })
        }
    }

    #[tokio::test]
    async fn test_supervisor_worker_happy_path() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let (boss, w1, w2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let req = request(
            "supervisor_worker",
            vec![
                ParticipantConfig::primary(boss),
                ParticipantConfig::invited(w1).with_instructions("Collect revenue figures"),
                ParticipantConfig::invited(w2).with_instructions("Draft the executive summary"),
            ],
        );
        let conversation = req.conversation_id;

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.stage_outputs.len(), 3);
        assert_eq!(session.stage_outputs[0].agent_id, boss);
        let result = session.final_result.unwrap();
        assert!(result.contains("Collect revenue figures"));
        assert!(result.contains("Draft the executive summary"));

        assert_eq!(uow.handoffs().count_for_conversation(conversation).unwrap(), 2);
        let mailbox = AgentMessageBus.get_conversation_messages(&uow, conversation, 50, 0).await;
        assert_eq!(mailbox.len(), 4);
    }

    #[tokio::test]
    async fn test_supervisor_without_workers_completes_with_error() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let req = request("supervisor_worker", vec![ParticipantConfig::primary(Uuid::new_v4())]);

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.final_result.unwrap().starts_with("Error: No workers found"));
        assert!(session.stage_outputs.is_empty());
    }

    #[tokio::test]
    async fn test_supervisor_missing() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let req = request("supervisor_worker", vec![ParticipantConfig::invited(Uuid::new_v4())]);

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.final_result.as_deref(), Some("Error: No supervisor found"));
    }

    #[tokio::test]
    async fn test_pipeline_cycle_completes_with_error() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let req = request(
            "pipeline",
            vec![
                ParticipantConfig::invited(a).depends_on(b),
                ParticipantConfig::invited(b).depends_on(a),
            ],
        );

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.final_result.unwrap().contains("cycle detected"));
        assert!(session.stage_outputs.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_runs_in_dependency_order() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let (load, extract) = (Uuid::new_v4(), Uuid::new_v4());
        let req = request(
            "pipeline",
            vec![
                ParticipantConfig::invited(load).with_instructions("Load").depends_on(extract),
                ParticipantConfig::invited(extract).with_instructions("Extract"),
            ],
        );

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        let order: Vec<_> = session.stage_outputs.iter().map(|s| s.agent_id).collect();
        assert_eq!(order, vec![extract, load]);

        let result = session.final_result.unwrap();
        assert!(result.starts_with(&format!("[agent {}]", load)));
        assert!(result.contains("Input from previous stage"));
    }

    #[tokio::test]
    async fn test_peer_review_always_three_stages() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let creator = Uuid::new_v4();

        for reviewers in [0, 2] {
            let mut participants = vec![ParticipantConfig::primary(creator)];
            participants.extend((0..reviewers).map(|_| ParticipantConfig::invited(Uuid::new_v4())));

            let session = orchestrator()
                .orchestrate_collaboration(&uow, request("peer_review", participants))
                .await
                .unwrap();
            assert_eq!(session.status, SessionStatus::Completed);
            assert_eq!(
                stage_names(&session),
                vec!["initial_creation", "peer_feedback", "final_revision"]
            );
            assert!(session.stage_outputs.iter().all(|s| s.agent_id == creator));
        }
    }

    #[tokio::test]
    async fn test_brainstorm_collects_every_contribution() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let agents: Vec<AgentId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut participants: Vec<_> = agents.iter().map(|a| ParticipantConfig::invited(*a)).collect();
        participants.push(ParticipantConfig::new(Uuid::new_v4(), ParticipantRole::Observer));

        let session = orchestrator_with(Arc::new(PricedRunner))
            .orchestrate_collaboration(&uow, request("brainstorm", participants))
            .await
            .unwrap();
        assert_eq!(session.stage_outputs.len(), 3);
        let result = session.final_result.unwrap();
        for agent in &agents {
            assert!(result.contains(&format!("idea from {}", agent)));
        }
        assert!((session.total_cost - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_consensus_two_rounds() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let lead = Uuid::new_v4();
        let participants = vec![
            ParticipantConfig::invited(Uuid::new_v4()),
            ParticipantConfig::primary(lead),
            ParticipantConfig::invited(Uuid::new_v4()),
        ];

        let session = orchestrator()
            .orchestrate_collaboration(&uow, request("consensus", participants))
            .await
            .unwrap();
        assert_eq!(
            stage_names(&session),
            vec!["initial_proposal", "initial_proposal", "initial_proposal", "consensus"]
        );
        assert_eq!(session.stage_outputs[3].agent_id, lead);
        assert!(session.final_result.unwrap().starts_with("Consensus reached"));
    }

    #[tokio::test]
    async fn test_delegation_runs_tasks() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let (lead, d1, d2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let participants = vec![
            ParticipantConfig::primary(lead),
            ParticipantConfig::invited(d1).with_instructions("Check the numbers"),
            ParticipantConfig::invited(d2).with_instructions("Format the tables"),
        ];

        let session = orchestrator()
            .orchestrate_collaboration(&uow, request("delegation", participants))
            .await
            .unwrap();
        assert_eq!(
            stage_names(&session),
            vec!["delegated_task", "delegated_task", "delegator_synthesis"]
        );
        assert_eq!(session.stage_outputs[2].agent_id, lead);
        assert!(session.stage_outputs[0].output.contains("Check the numbers"));

        for delegate in [d1, d2] {
            let pending = uow.tasks().pending_for_agent(delegate, None, 10).unwrap();
            assert!(pending.is_empty());
        }
        let completed: i64 = uow
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM agent_tasks WHERE status = ?1",
                [TaskStatus::Completed.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(completed, 2);
    }

    #[tokio::test]
    async fn test_runner_failure_marks_session_failed() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let req = request("brainstorm", vec![ParticipantConfig::invited(Uuid::new_v4())]);

        let session = orchestrator_with(Arc::new(FailingRunner))
            .orchestrate_collaboration(&uow, req)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session.final_result.unwrap().contains("model unavailable"));
        assert!(session.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_participants_fail_session() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let agent = Uuid::new_v4();
        let req = request(
            "brainstorm",
            vec![ParticipantConfig::primary(agent), ParticipantConfig::invited(agent)],
        );

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session.final_result.unwrap().contains("already participates"));
        assert!(uow.sessions().participants(session.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_not_executed() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let req = request("round_robin", vec![ParticipantConfig::primary(Uuid::new_v4())]);

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session.pattern.is_none());
        assert!(uow.sessions().participants(session.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_pattern_requires_a_pattern() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let mut session = CollaborationSession::new(Uuid::new_v4(), CollaborationPattern::Brainstorm, "x");
        session.pattern = None;

        let err = orchestrator()
            .execute_pattern(&uow, &session, &[], "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn test_team_context_is_prepended() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = Uuid::new_v4();
        TeamMemoryBus::new(Arc::new(SqliteMemoryRepository::new()), CollaborationSettings::default())
            .store_team_knowledge(&uow, TeamKnowledge::new(team, "Figures are in EUR"))
            .await
            .unwrap();

        let mut req = request("brainstorm", vec![ParticipantConfig::invited(Uuid::new_v4())]);
        req.team_id = Some(team);
        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert!(session.stage_outputs[0].output.contains("Team knowledge:\n- Figures are in EUR"));
    }

    #[tokio::test]
    async fn test_refused_handoff_does_not_abort_pattern() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let req = request(
            "supervisor_worker",
            vec![
                ParticipantConfig::primary(Uuid::new_v4()),
                ParticipantConfig::invited(Uuid::new_v4()).with_instructions("Proofread"),
            ],
        );
        for _ in 0..3 {
            uow.handoffs()
                .insert(&AgentHandoff {
                    id: Uuid::new_v4(),
                    conversation_id: req.conversation_id,
                    from_agent_id: Uuid::new_v4(),
                    to_agent_id: Uuid::new_v4(),
                    reason: "earlier".into(),
                    context: Default::default(),
                    handoff_at: Utc::now(),
                })
                .unwrap();
        }

        let session = orchestrator().orchestrate_collaboration(&uow, req).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.stage_outputs.len(), 2);
        assert!(session.final_result.unwrap().contains("Proofread"));
    }
}
