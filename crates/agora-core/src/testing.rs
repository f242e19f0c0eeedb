//! Seeding helpers for tests

use uuid::Uuid;

use crate::db::UnitOfWork;
use crate::model::{AgentRecord, TeamId, UserId};
use crate::Result;

/// A team with one member, ready for agents
pub struct SeededTeam {
    pub team_id: TeamId,
    pub user_id: UserId,
}

impl SeededTeam {
    pub fn create(uow: &UnitOfWork<'_>) -> Result<Self> {
        let team_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        uow.agents().insert_team(team_id, "test team")?;
        uow.agents().add_member(team_id, user_id)?;
        Ok(Self { team_id, user_id })
    }

    /// Insert an agent with the given shared and custom skills
    pub fn agent(
        &self,
        uow: &UnitOfWork<'_>,
        name: &str,
        shared: &[&str],
        custom: &[&str],
    ) -> Result<AgentRecord> {
        let agent = AgentRecord::new(self.team_id, name)
            .with_shared_skills(shared.iter().copied())
            .with_custom_skills(custom.iter().copied());
        uow.agents().insert(&agent)?;
        Ok(agent)
    }

    /// Insert a prepared record after pointing it at this team
    pub fn insert(&self, uow: &UnitOfWork<'_>, mut agent: AgentRecord) -> Result<AgentRecord> {
        agent.team_id = self.team_id;
        uow.agents().insert(&agent)?;
        Ok(agent)
    }
}
