//! Role-based collaboration patterns

use futures::future::join_all;

use agora_core::model::{DelegationRequest, MessageType, OutgoingMessage, ParticipantRole};
use agora_core::{Result, UnitOfWork};

use super::{CollaborationOrchestrator, PatternRun};

impl CollaborationOrchestrator {
    /// One primary plans, each invited worker executes its instructions
    pub(super) async fn supervisor_worker(
        &self,
        uow: &UnitOfWork<'_>,
        run: &PatternRun<'_>,
    ) -> Result<String> {
        let Some(supervisor) = run.with_role(ParticipantRole::Primary).into_iter().next() else {
            return Ok("Error: No supervisor found".to_string());
        };
        let workers = run.with_role(ParticipantRole::Invited);
        if workers.is_empty() {
            return Ok("Error: No workers found".to_string());
        }

        let plan = self
            .consult(
                uow,
                run,
                "supervisor_planning",
                supervisor.agent_id,
                &format!("Split this goal across {} workers: {}", workers.len(), run.goal),
            )
            .await?;

        let mut synthesis = format!("Supervisor synthesis for: {}\n", run.goal);
        for worker in workers {
            let instructions = run.instructions(worker);
            self.coordinate_agents(uow, run.conversation_id, supervisor.agent_id, worker.agent_id, instructions)
                .await?;

            let assignment = self
                .messages
                .send_message(
                    uow,
                    OutgoingMessage::new(
                        run.conversation_id,
                        supervisor.agent_id,
                        worker.agent_id,
                        MessageType::TaskRequest.as_str(),
                        instructions,
                    )
                    .with_subject(run.goal),
                )
                .await;

            let output = self
                .consult(
                    uow,
                    run,
                    "worker_execution",
                    worker.agent_id,
                    &format!("Goal: {}\nPlan: {}\nYour task: {}", run.goal, plan, instructions),
                )
                .await?;

            if let Some(assignment) = assignment {
                self.messages.send_reply(uow, assignment.id, output.as_str()).await;
            }
            synthesis.push_str(&format!("- {} ({}): {}\n", worker.agent_id, instructions, output));
        }

        Ok(synthesis)
    }

    /// Draft, collected feedback, revision; always three stages
    pub(super) async fn peer_review(&self, uow: &UnitOfWork<'_>, run: &PatternRun<'_>) -> Result<String> {
        let Some(creator) = run.with_role(ParticipantRole::Primary).into_iter().next() else {
            return Ok("Error: No creator found".to_string());
        };
        let reviewers = run.with_role(ParticipantRole::Invited);

        let draft = self
            .consult(
                uow,
                run,
                "initial_creation",
                creator.agent_id,
                &format!("Create an initial draft for: {}", run.goal),
            )
            .await?;

        let mut notes = Vec::with_capacity(reviewers.len());
        for reviewer in reviewers {
            let review = self
                .invoke(
                    run,
                    reviewer.agent_id,
                    &format!("Review this draft and suggest improvements:\n{}", draft),
                )
                .await?;
            self.record_turn(uow, run, reviewer.agent_id, &review.text, review.cost)
                .await?;
            self.messages
                .send_message(
                    uow,
                    OutgoingMessage::new(
                        run.conversation_id,
                        reviewer.agent_id,
                        creator.agent_id,
                        MessageType::Feedback.as_str(),
                        review.text.as_str(),
                    ),
                )
                .await;
            notes.push(format!("- {}: {}", reviewer.agent_id, review.text));
        }

        let feedback = if notes.is_empty() {
            "No reviewer feedback".to_string()
        } else {
            notes.join("\n")
        };
        self.record_stage(uow, run, "peer_feedback", creator.agent_id, &feedback)
            .await?;

        self.consult(
            uow,
            run,
            "final_revision",
            creator.agent_id,
            &format!("Revise the draft using this feedback:\n{}\n\nDraft:\n{}", feedback, draft),
        )
        .await
    }

    /// Independent contributions gathered concurrently
    pub(super) async fn brainstorm(&self, uow: &UnitOfWork<'_>, run: &PatternRun<'_>) -> Result<String> {
        let contributors = run.acting();
        if contributors.is_empty() {
            return Ok("Error: No participants found".to_string());
        }

        let base = format!("Brainstorm ideas for: {}", run.goal);
        let prompts: Vec<String> = contributors
            .iter()
            .map(|p| {
                if p.instructions.is_empty() {
                    base.clone()
                } else {
                    format!("{}\nFocus: {}", base, p.instructions)
                }
            })
            .collect();

        let outputs = join_all(
            contributors
                .iter()
                .zip(&prompts)
                .map(|(p, prompt)| self.invoke(run, p.agent_id, prompt)),
        )
        .await;

        let mut ideas = format!("Brainstorm results for: {}\n", run.goal);
        for (participant, output) in contributors.iter().zip(outputs) {
            let output = output?;
            self.record_turn(uow, run, participant.agent_id, &output.text, output.cost)
                .await?;
            self.record_stage(uow, run, "brainstorm_contribution", participant.agent_id, &output.text)
                .await?;
            ideas.push_str(&format!("- {}: {}\n", participant.agent_id, output.text));
        }

        Ok(ideas)
    }

    /// Proposals from everyone, then one synthesized agreement
    pub(super) async fn consensus(&self, uow: &UnitOfWork<'_>, run: &PatternRun<'_>) -> Result<String> {
        let voters = run.acting();
        let Some(&first) = voters.first() else {
            return Ok("Error: No participants found".to_string());
        };

        let mut proposals = Vec::with_capacity(voters.len());
        for voter in &voters {
            let proposal = self
                .consult(
                    uow,
                    run,
                    "initial_proposal",
                    voter.agent_id,
                    &format!("Propose an approach for: {}", run.goal),
                )
                .await?;
            proposals.push(format!("- {}: {}", voter.agent_id, proposal));
        }

        let facilitator = run
            .with_role(ParticipantRole::Primary)
            .into_iter()
            .next()
            .unwrap_or(first);
        let agreement = self
            .consult(
                uow,
                run,
                "consensus",
                facilitator.agent_id,
                &format!("Find the common ground in these proposals:\n{}", proposals.join("\n")),
            )
            .await?;

        Ok(format!("Consensus reached: {}", agreement))
    }

    /// Tasks for each delegate, run to completion, then merged by the delegator
    pub(super) async fn delegation(&self, uow: &UnitOfWork<'_>, run: &PatternRun<'_>) -> Result<String> {
        let Some(delegator) = run.with_role(ParticipantRole::Primary).into_iter().next() else {
            return Ok("Error: No delegator found".to_string());
        };
        let delegates = run.with_role(ParticipantRole::Invited);
        if delegates.is_empty() {
            return Ok("Error: No delegates found".to_string());
        }

        let mut reports = Vec::with_capacity(delegates.len());
        for delegate in delegates {
            let description = if run.team_context.is_empty() {
                run.instructions(delegate).to_string()
            } else {
                format!("{}\n{}", run.team_context, run.instructions(delegate))
            };
            let request = DelegationRequest::new(
                run.conversation_id,
                delegator.agent_id,
                delegate.agent_id,
                run.goal,
                description,
            );

            let report = match self.delegations.delegate_task(uow, request).await? {
                Ok(task) => match self
                    .executor
                    .run_task(uow, task.id, delegate.agent_id, self.runner.as_ref())
                    .await?
                {
                    Ok(done) => {
                        let text = done.result.or(done.error).unwrap_or_default();
                        format!("{}: {}", done.status, text)
                    }
                    Err(rejection) => rejection.to_error_string(),
                },
                Err(rejection) => rejection.to_error_string(),
            };

            self.record_turn(uow, run, delegate.agent_id, &report, 0.0).await?;
            self.record_stage(uow, run, "delegated_task", delegate.agent_id, &report)
                .await?;
            reports.push(format!("- {}: {}", delegate.agent_id, report));
        }

        self.consult(
            uow,
            run,
            "delegator_synthesis",
            delegator.agent_id,
            &format!("Combine the delegated results for: {}\n{}", run.goal, reports.join("\n")),
        )
        .await
    }
}
