//! Task delegation with bounded depth
//!
//! A delegated task records its depth when it is created (parent depth + 1,
//! roots are 0). The stored value is authoritative; parents are never walked.

use chrono::Utc;
use tracing::{info, warn};

use agora_core::model::{AgentId, AgentTask, ConversationId, DelegationRequest, TaskId, TaskStatus};
use agora_core::{CollaborationSettings, Decision, Rejection, RejectionKind, Result, UnitOfWork};

pub struct DelegationManager {
    settings: CollaborationSettings,
}

impl DelegationManager {
    pub fn new(settings: CollaborationSettings) -> Self {
        Self { settings }
    }

    /// Create a pending task for another agent
    pub async fn delegate_task(
        &self,
        uow: &UnitOfWork<'_>,
        request: DelegationRequest,
    ) -> Result<Decision<AgentTask>> {
        if request.created_by_agent_id == request.assigned_to_agent_id {
            return Ok(Err(Rejection::new(
                RejectionKind::SelfDelegation,
                format!("Agent {} cannot delegate a task to itself", request.created_by_agent_id),
            )));
        }

        let delegation_depth = match request.parent_task_id {
            Some(parent_id) => match uow.tasks().get(parent_id)? {
                Some(parent) => parent.delegation_depth + 1,
                None => return Ok(Err(Rejection::not_found("Parent task", parent_id))),
            },
            None => 0,
        };

        let max_depth = self.settings.max_delegation_depth;
        if delegation_depth > max_depth {
            warn!(
                conversation_id = %request.conversation_id,
                "Delegation refused at depth {} (max {})",
                delegation_depth,
                max_depth
            );
            return Ok(Err(Rejection::depth_exceeded(format!(
                "Maximum delegation depth ({}) exceeded: task would be at depth {}",
                max_depth, delegation_depth
            ))));
        }

        let task = AgentTask {
            id: uuid::Uuid::new_v4(),
            conversation_id: request.conversation_id,
            title: request.title,
            description: request.description,
            status: TaskStatus::Pending,
            priority: request.priority,
            assigned_to_agent_id: request.assigned_to_agent_id,
            created_by_agent_id: request.created_by_agent_id,
            parent_task_id: request.parent_task_id,
            delegation_depth,
            result: None,
            error: None,
            timeout_seconds: request
                .timeout_seconds
                .unwrap_or(self.settings.default_task_timeout_secs),
            metadata: request.metadata,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        uow.tasks().insert(&task)?;

        info!(
            task_id = %task.id,
            depth = task.delegation_depth,
            "Agent {} delegated '{}' to {}",
            task.created_by_agent_id,
            task.title,
            task.assigned_to_agent_id
        );
        Ok(Ok(task))
    }

    /// Stored depth of a task
    pub async fn check_delegation_depth(&self, uow: &UnitOfWork<'_>, task_id: TaskId) -> Result<Decision<u32>> {
        Ok(match uow.tasks().get(task_id)? {
            Some(task) => Ok(task.delegation_depth),
            None => Err(Rejection::not_found("Task", task_id)),
        })
    }

    /// Pending tasks of an agent: lowest priority number first, then oldest
    pub async fn get_pending_tasks(
        &self,
        uow: &UnitOfWork<'_>,
        assigned_to: AgentId,
        conversation_id: Option<ConversationId>,
        limit: usize,
    ) -> Result<Vec<AgentTask>> {
        uow.tasks().pending_for_agent(assigned_to, conversation_id, limit)
    }

    /// Finish a task with a terminal status and its result text
    ///
    /// For `Failed` the text is stored as the task error.
    pub async fn complete_task(
        &self,
        uow: &UnitOfWork<'_>,
        task_id: TaskId,
        result: &str,
        status: TaskStatus,
    ) -> Result<Decision<AgentTask>> {
        let Some(mut task) = uow.tasks().get(task_id)? else {
            return Ok(Err(Rejection::not_found("Task", task_id)));
        };

        if !status.is_terminal() {
            return Ok(Err(Rejection::invalid_transition(format!(
                "Cannot complete task {} with non-terminal status {}",
                task_id, status
            ))));
        }
        if task.status.is_terminal() {
            return Ok(Err(Rejection::invalid_transition(format!(
                "Task {} is already {}",
                task_id, task.status
            ))));
        }

        task.status = status;
        if status == TaskStatus::Failed {
            task.error = Some(result.to_string());
        } else {
            task.result = Some(result.to_string());
        }
        task.completed_at.get_or_insert_with(Utc::now);
        uow.tasks().update(&task)?;

        info!(task_id = %task.id, "Task completed with status {}", task.status);
        Ok(Ok(task))
    }

    /// Direct children of a task in creation order
    pub async fn get_subtasks(&self, uow: &UnitOfWork<'_>, parent_task_id: TaskId) -> Result<Vec<AgentTask>> {
        uow.tasks().children(parent_task_id)
    }
}
