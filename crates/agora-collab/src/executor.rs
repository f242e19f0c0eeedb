//! Task lifecycle
//!
//! `Pending -> InProgress -> {Completed, Failed, Cancelled, TimedOut}`.
//! Start and completion timestamps are written once and never moved.
//!
//! Terminal states are absorbing, as for collaboration sessions: a finished
//! task is never restarted by `execute_task` and never moved to a different
//! terminal status. Repeating the current terminal status is accepted.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use agora_core::model::{AgentId, AgentTask, TaskId, TaskStatus};
use agora_core::{Decision, Rejection, RejectionKind, Result, UnitOfWork};

use crate::runner::AgentRunner;

fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
    match from {
        TaskStatus::Pending => true,
        TaskStatus::InProgress => to != TaskStatus::Pending,
        // terminal: only a repeat of the same status
        terminal => terminal == to,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExecutor;

impl TaskExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_task(&self, uow: &UnitOfWork<'_>, task_id: TaskId) -> Result<Option<AgentTask>> {
        uow.tasks().get(task_id)
    }

    /// Move a task to `InProgress` on behalf of its assignee
    ///
    /// A different executor gets the task back unchanged.
    pub async fn execute_task(
        &self,
        uow: &UnitOfWork<'_>,
        task_id: TaskId,
        executor_agent_id: AgentId,
    ) -> Result<Decision<AgentTask>> {
        let Some(mut task) = uow.tasks().get(task_id)? else {
            return Ok(Err(Rejection::not_found("Task", task_id)));
        };

        if task.assigned_to_agent_id != executor_agent_id {
            warn!(
                task_id = %task.id,
                "Agent {} tried to execute a task assigned to {}",
                executor_agent_id,
                task.assigned_to_agent_id
            );
            return Ok(Ok(task));
        }

        if task.status.is_terminal() {
            return Ok(Err(Rejection::invalid_transition(format!(
                "Task {} is already {}",
                task.id, task.status
            ))));
        }

        task.status = TaskStatus::InProgress;
        task.started_at.get_or_insert_with(Utc::now);
        uow.tasks().update(&task)?;

        debug!(task_id = %task.id, "Task started by {}", executor_agent_id);
        Ok(Ok(task))
    }

    /// Change the status of a task, stamping completion on terminal statuses
    pub async fn update_task_status(
        &self,
        uow: &UnitOfWork<'_>,
        task_id: TaskId,
        status: TaskStatus,
        result: Option<String>,
        error: Option<String>,
    ) -> Result<Decision<AgentTask>> {
        let Some(mut task) = uow.tasks().get(task_id)? else {
            return Ok(Err(Rejection::not_found("Task", task_id)));
        };

        if !can_transition(task.status, status) {
            return Ok(Err(Rejection::invalid_transition(format!(
                "Task {} cannot move from {} to {}",
                task.id, task.status, status
            ))));
        }

        task.status = status;
        if result.is_some() {
            task.result = result;
        }
        if error.is_some() {
            task.error = error;
        }
        if status == TaskStatus::InProgress {
            task.started_at.get_or_insert_with(Utc::now);
        }
        if status.is_terminal() {
            task.completed_at.get_or_insert_with(Utc::now);
        }
        uow.tasks().update(&task)?;

        debug!(task_id = %task.id, "Task status is now {}", task.status);
        Ok(Ok(task))
    }

    /// Execute a task through an agent runner, bounded by the task timeout
    ///
    /// Unlike `execute_task`, a runner for someone else's task is rejected
    /// with [`RejectionKind::AssignmentMismatch`].
    pub async fn run_task(
        &self,
        uow: &UnitOfWork<'_>,
        task_id: TaskId,
        executor_agent_id: AgentId,
        runner: &dyn AgentRunner,
    ) -> Result<Decision<AgentTask>> {
        let task = match self.execute_task(uow, task_id, executor_agent_id).await? {
            Ok(task) => task,
            Err(rejection) => return Ok(Err(rejection)),
        };
        if task.assigned_to_agent_id != executor_agent_id {
            return Ok(Err(Rejection::new(
                RejectionKind::AssignmentMismatch,
                format!("Task {} is assigned to {}", task.id, task.assigned_to_agent_id),
            )));
        }

        let prompt = format!("{}\n\n{}", task.title, task.description);
        let limit = Duration::from_secs(task.timeout_seconds);
        let (status, result, error) =
            match tokio::time::timeout(limit, runner.run(executor_agent_id, &prompt)).await {
                Ok(Ok(run)) => (TaskStatus::Completed, Some(run.text), None),
                Ok(Err(e)) => {
                    warn!(task_id = %task.id, "Task failed: {}", e);
                    (TaskStatus::Failed, None, Some(e.to_string()))
                }
                Err(_) => {
                    warn!(task_id = %task.id, "Task timed out after {}s", task.timeout_seconds);
                    (
                        TaskStatus::TimedOut,
                        None,
                        Some(format!("Task timed out after {} seconds", task.timeout_seconds)),
                    )
                }
            };

        info!(task_id = %task.id, "Task finished with status {}", status);
        self.update_task_status(uow, task.id, status, result, error).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegation::DelegationManager;
    use crate::runner::{AgentRun, SimulatedRunner};
    use agora_core::model::DelegationRequest;
    use agora_core::{CollaborationSettings, Database, Error};
    use async_trait::async_trait;
    use uuid::Uuid;

    struct FailingRunner;

    #[async_trait]
    impl AgentRunner for FailingRunner {
        async fn run(&self, _agent_id: AgentId, _prompt: &str) -> Result<AgentRun> {
            Err(Error::Runner("model unavailable".into()))
        }
    }

    struct StalledRunner;

    #[async_trait]
    impl AgentRunner for StalledRunner {
        async fn run(&self, _agent_id: AgentId, _prompt: &str) -> Result<AgentRun> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(Error::Runner("unreachable".into()))
        }
    }

    async fn seed_task(uow: &UnitOfWork<'_>, timeout_secs: u64) -> AgentTask {
        let request = DelegationRequest::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Fetch report",
            "Pull the weekly numbers",
        )
        .with_timeout(timeout_secs);
        DelegationManager::new(CollaborationSettings::default())
            .delegate_task(uow, request)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_stamps_start_once() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let task = seed_task(&uow, 60).await;

        let started = TaskExecutor.execute_task(&uow, task.id, task.assigned_to_agent_id).await.unwrap().unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);
        let first_start = started.started_at.unwrap();

        let again = TaskExecutor.execute_task(&uow, task.id, task.assigned_to_agent_id).await.unwrap().unwrap();
        assert_eq!(again.started_at, Some(first_start));
    }

    #[tokio::test]
    async fn test_execute_by_wrong_agent_returns_task_unchanged() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let task = seed_task(&uow, 60).await;

        let unchanged = TaskExecutor.execute_task(&uow, task.id, Uuid::new_v4()).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TaskStatus::Pending);
        assert!(unchanged.started_at.is_none());
        assert_eq!(unchanged.assigned_to_agent_id, task.assigned_to_agent_id);
    }

    #[tokio::test]
    async fn test_terminal_status_is_sticky() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let task = seed_task(&uow, 60).await;

        let done = TaskExecutor
            .update_task_status(&uow, task.id, TaskStatus::Completed, Some("ok".into()), None)
            .await
            .unwrap()
            .unwrap();
        let completed_at = done.completed_at.unwrap();

        let repeat = TaskExecutor
            .update_task_status(&uow, task.id, TaskStatus::Completed, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repeat.completed_at, Some(completed_at));
        assert_eq!(repeat.result.as_deref(), Some("ok"));

        let reopen = TaskExecutor
            .update_task_status(&uow, task.id, TaskStatus::Failed, None, None)
            .await
            .unwrap();
        assert_eq!(reopen.unwrap_err().kind, RejectionKind::InvalidTransition);

        let restart = TaskExecutor.execute_task(&uow, task.id, task.assigned_to_agent_id).await.unwrap();
        assert_eq!(restart.unwrap_err().kind, RejectionKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_run_task_completes_with_runner_output() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let task = seed_task(&uow, 60).await;

        let done = TaskExecutor
            .run_task(&uow, task.id, task.assigned_to_agent_id, &SimulatedRunner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.result.unwrap().contains("Pull the weekly numbers"));
        assert!(done.started_at.is_some() && done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_run_task_records_runner_failure() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let task = seed_task(&uow, 60).await;

        let failed = TaskExecutor
            .run_task(&uow, task.id, task.assigned_to_agent_id, &FailingRunner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert!(failed.error.unwrap().contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_run_task_by_wrong_agent_is_rejected() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let task = seed_task(&uow, 60).await;

        let rejected = TaskExecutor
            .run_task(&uow, task.id, Uuid::new_v4(), &SimulatedRunner)
            .await
            .unwrap();
        assert_eq!(rejected.unwrap_err().kind, RejectionKind::AssignmentMismatch);

        let stored = TaskExecutor.get_task(&uow, task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert!(stored.result.is_none());
    }

    #[tokio::test]
    async fn test_run_task_times_out() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let task = seed_task(&uow, 1).await;

        let timed_out = TaskExecutor
            .run_task(&uow, task.id, task.assigned_to_agent_id, &StalledRunner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(timed_out.status, TaskStatus::TimedOut);
        assert!(timed_out.completed_at.is_some());
    }
}
