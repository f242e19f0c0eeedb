//! Agent directory
//!
//! Turns persisted agent records into routing profiles and answers
//! capability and capacity questions about them.

use std::collections::HashSet;

use agora_core::model::{AgentAvailability, AgentProfile, AgentRecord, TeamId, UserId};
use agora_core::{Result, UnitOfWork};
use tracing::debug;

/// Seconds of expected wait per task queued beyond an agent's capacity
const WAIT_PER_EXCESS_TASK_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default)]
pub struct AgentDirectory;

impl AgentDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Active agents of a team
    pub async fn get_available_agents(
        &self,
        uow: &UnitOfWork<'_>,
        team_id: TeamId,
    ) -> Result<Vec<AgentRecord>> {
        uow.agents().active_for_team(team_id)
    }

    /// Profiles of every active agent in the teams the user belongs to
    pub async fn list_agents(&self, uow: &UnitOfWork<'_>, user_id: UserId) -> Result<Vec<AgentProfile>> {
        let agents = uow.agents().active_for_user(user_id)?;
        debug!("Directory lists {} agents for user {}", agents.len(), user_id);
        Ok(agents.iter().map(|a| self.get_agent_profile(a)).collect())
    }

    pub fn get_agent_profile(&self, agent: &AgentRecord) -> AgentProfile {
        let personality_summary = agent
            .tagline
            .clone()
            .or_else(|| agent.personality.summary.clone())
            .unwrap_or_default();

        AgentProfile {
            agent_id: agent.id,
            name: agent.name.clone(),
            capabilities: agent.skill_names(),
            specializations: agent.custom_skills.clone(),
            personality_summary,
            avg_response_ms: agent.avg_response_ms,
        }
    }

    /// Capacity check; the task limit comes from the agent's boundaries
    pub fn check_availability(&self, agent: &AgentRecord, current_load: u32) -> AgentAvailability {
        let max_concurrent_tasks = agent.boundaries.max_tool_calls_per_turn;
        let available = agent.is_active() && current_load < max_concurrent_tasks;
        let estimated_wait_secs = if available {
            0
        } else {
            u64::from(current_load.saturating_sub(max_concurrent_tasks)) * WAIT_PER_EXCESS_TASK_SECS
                + WAIT_PER_EXCESS_TASK_SECS
        };

        AgentAvailability {
            agent_id: agent.id,
            available,
            current_load,
            max_concurrent_tasks,
            estimated_wait_secs,
        }
    }

    /// Keep agents whose skills cover every required skill
    pub fn filter_by_skills(&self, agents: Vec<AgentRecord>, required_skills: &[String]) -> Vec<AgentRecord> {
        if required_skills.is_empty() {
            return agents;
        }

        agents
            .into_iter()
            .filter(|agent| {
                let skills: HashSet<String> = agent.skill_names().into_iter().collect();
                required_skills.iter().all(|s| skills.contains(s))
            })
            .collect()
    }
}
