//! Collaboration session lifecycle
//!
//! `Active -> {Completed, Failed, TimedOut, Cancelled}`. Terminal states are
//! absorbing and the completion timestamp is written on the first transition
//! into one of them.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use agora_core::model::{
    AgentId, CollaborationParticipant, CollaborationPattern, CollaborationSession,
    ConversationId, ParticipantConfig, SessionId, SessionStatus, StageOutput,
    StatusUpdateRequest,
};
use agora_core::{Decision, Error, Rejection, Result, UnitOfWork};

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiAgentManager;

impl MultiAgentManager {
    pub fn new() -> Self {
        Self
    }

    /// Create a session from a raw pattern name
    ///
    /// An unknown pattern still yields a persisted session, already `Failed`,
    /// with the validation error under `metadata.error`.
    pub async fn create_collaboration(
        &self,
        uow: &UnitOfWork<'_>,
        conversation_id: ConversationId,
        pattern: &str,
        goal: &str,
    ) -> Result<CollaborationSession> {
        match pattern.parse::<CollaborationPattern>() {
            Ok(pattern) => self.create_session(uow, conversation_id, pattern, goal).await,
            Err(error) => {
                warn!(conversation_id = %conversation_id, "Rejected collaboration: {}", error);
                let final_result = format!("Error: {}", error);
                let session = CollaborationSession {
                    pattern: None,
                    status: SessionStatus::Failed,
                    metadata: json!({ "error": error, "requested_pattern": pattern }),
                    completed_at: Some(Utc::now()),
                    final_result: Some(final_result),
                    ..CollaborationSession::new(conversation_id, CollaborationPattern::Brainstorm, goal)
                };
                uow.sessions().insert(&session)?;
                Ok(session)
            }
        }
    }

    /// Create an active session for a known pattern
    pub async fn create_session(
        &self,
        uow: &UnitOfWork<'_>,
        conversation_id: ConversationId,
        pattern: CollaborationPattern,
        goal: &str,
    ) -> Result<CollaborationSession> {
        let session = CollaborationSession::new(conversation_id, pattern, goal);
        uow.sessions().insert(&session)?;

        info!(session_id = %session.id, "Created {} collaboration", pattern);
        Ok(session)
    }

    /// Add participants to an existing session
    ///
    /// A pair that is already on the roster, or repeated in `configs`, is
    /// [`Error::DuplicateParticipant`]. The roster is checked before the first
    /// insert, so a rejected call writes nothing.
    pub async fn add_participants(
        &self,
        uow: &UnitOfWork<'_>,
        session_id: SessionId,
        configs: &[ParticipantConfig],
    ) -> Result<Decision<Vec<CollaborationParticipant>>> {
        if uow.sessions().get(session_id)?.is_none() {
            return Ok(Err(Rejection::not_found("Session", session_id)));
        }

        let mut seen: HashSet<AgentId> = uow
            .sessions()
            .participants(session_id)?
            .into_iter()
            .map(|p| p.agent_id)
            .collect();
        for config in configs {
            if !seen.insert(config.agent_id) {
                return Err(Error::DuplicateParticipant {
                    session_id,
                    agent_id: config.agent_id,
                });
            }
        }

        let mut added = Vec::with_capacity(configs.len());
        for config in configs {
            let participant = CollaborationParticipant {
                session_id,
                agent_id: config.agent_id,
                role: config.role,
                contribution: None,
                turn_count: 0,
                cost: 0.0,
                joined_at: Utc::now(),
            };
            uow.sessions().insert_participant(&participant)?;
            added.push(participant);
        }

        debug!(session_id = %session_id, "Added {} participants", added.len());
        Ok(Ok(added))
    }

    /// Move a session to a new status
    ///
    /// Repeating the current terminal status is a no-op; leaving a terminal
    /// status is rejected.
    pub async fn update_session_status(
        &self,
        uow: &UnitOfWork<'_>,
        session_id: SessionId,
        update: StatusUpdateRequest,
    ) -> Result<Decision<CollaborationSession>> {
        let Some(mut session) = uow.sessions().get(session_id)? else {
            return Ok(Err(Rejection::not_found("Session", session_id)));
        };

        if session.status.is_terminal() {
            if session.status == update.status {
                return Ok(Ok(session));
            }
            return Ok(Err(Rejection::invalid_transition(format!(
                "Session {} is already {}",
                session_id, session.status
            ))));
        }

        session.status = update.status;
        if update.final_result.is_some() {
            session.final_result = update.final_result;
        }
        if update.status.is_terminal() {
            let completed_at = *session.completed_at.get_or_insert_with(Utc::now);
            let elapsed = completed_at - session.started_at;
            session.total_duration_ms = u64::try_from(elapsed.num_milliseconds()).unwrap_or(0);
        }
        uow.sessions().update(&session)?;

        info!(session_id = %session.id, "Session status is now {}", session.status);
        Ok(Ok(session))
    }

    /// Append one audit-trail entry
    pub async fn record_stage(
        &self,
        uow: &UnitOfWork<'_>,
        session_id: SessionId,
        stage: &StageOutput,
    ) -> Result<u32> {
        uow.sessions().append_stage(session_id, stage)
    }

    /// Count a participant turn and charge its cost to the session
    pub async fn record_participant_turn(
        &self,
        uow: &UnitOfWork<'_>,
        session_id: SessionId,
        agent_id: AgentId,
        contribution: &str,
        cost: f64,
    ) -> Result<bool> {
        let recorded = uow.sessions().record_turn(session_id, agent_id, contribution, cost)?;
        if recorded {
            uow.sessions().add_cost(session_id, cost)?;
        }
        Ok(recorded)
    }

    pub async fn get_session(
        &self,
        uow: &UnitOfWork<'_>,
        session_id: SessionId,
    ) -> Result<Option<CollaborationSession>> {
        uow.sessions().get(session_id)
    }

    pub async fn get_participants(
        &self,
        uow: &UnitOfWork<'_>,
        session_id: SessionId,
    ) -> Result<Vec<CollaborationParticipant>> {
        uow.sessions().participants(session_id)
    }

    pub async fn list_sessions(
        &self,
        uow: &UnitOfWork<'_>,
        conversation_id: ConversationId,
    ) -> Result<Vec<CollaborationSession>> {
        uow.sessions().list_for_conversation(conversation_id)
    }
}
