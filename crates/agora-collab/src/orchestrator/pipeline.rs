//! Dependency-ordered pipeline

use std::collections::{HashMap, VecDeque};

use tracing::warn;

use agora_core::model::{AgentId, ParticipantConfig};
use agora_core::{Result, UnitOfWork};

use super::{CollaborationOrchestrator, PatternRun};

/// Kahn ordering of `stages` by their `dependencies`
///
/// Ties keep input order. Dependencies on agents outside `stages` are
/// ignored. `None` when the graph has a cycle.
pub(crate) fn topological_order(stages: &[&ParticipantConfig]) -> Option<Vec<usize>> {
    let position: HashMap<AgentId, usize> = stages
        .iter()
        .enumerate()
        .map(|(idx, stage)| (stage.agent_id, idx))
        .collect();

    let mut indegree = vec![0usize; stages.len()];
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); stages.len()];
    for (idx, stage) in stages.iter().enumerate() {
        for dependency in &stage.dependencies {
            if let Some(&upstream) = position.get(dependency) {
                indegree[idx] += 1;
                downstream[upstream].push(idx);
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..stages.len()).filter(|&idx| indegree[idx] == 0).collect();
    let mut order = Vec::with_capacity(stages.len());
    while let Some(idx) = ready.pop_front() {
        order.push(idx);
        for &next in &downstream[idx] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    (order.len() == stages.len()).then_some(order)
}

impl CollaborationOrchestrator {
    /// Each stage works on the previous stage's output; the last output is the result
    pub(super) async fn pipeline(&self, uow: &UnitOfWork<'_>, run: &PatternRun<'_>) -> Result<String> {
        let stages = run.acting();
        if stages.is_empty() {
            return Ok("Error: No pipeline participants found".to_string());
        }

        let Some(order) = topological_order(&stages) else {
            warn!(session_id = %run.session_id, "Pipeline dependencies form a cycle");
            return Ok("Error: Pipeline cycle detected among participant dependencies".to_string());
        };

        let mut previous: Option<(AgentId, String)> = None;
        for idx in order {
            let stage = stages[idx];
            let prompt = match &previous {
                Some((upstream, output)) => {
                    self.coordinate_agents(
                        uow,
                        run.conversation_id,
                        *upstream,
                        stage.agent_id,
                        "Pipeline stage complete",
                    )
                    .await?;
                    format!(
                        "Goal: {}\nYour step: {}\nInput from previous stage:\n{}",
                        run.goal,
                        run.instructions(stage),
                        output
                    )
                }
                None => format!("Goal: {}\nYour step: {}", run.goal, run.instructions(stage)),
            };

            let output = self
                .consult(uow, run, "pipeline_stage", stage.agent_id, &prompt)
                .await?;
            previous = Some((stage.agent_id, output));
        }

        Ok(previous.map(|(_, output)| output).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ids(n: usize) -> Vec<AgentId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_order_follows_dependencies() {
        let a = ids(3);
        let configs = vec![
            ParticipantConfig::invited(a[0]).depends_on(a[2]),
            ParticipantConfig::invited(a[1]),
            ParticipantConfig::invited(a[2]).depends_on(a[1]),
        ];
        let stages: Vec<_> = configs.iter().collect();
        assert_eq!(topological_order(&stages), Some(vec![1, 2, 0]));
    }

    #[test]
    fn test_independent_stages_keep_input_order() {
        let a = ids(3);
        let configs: Vec<_> = a.iter().map(|id| ParticipantConfig::invited(*id)).collect();
        let stages: Vec<_> = configs.iter().collect();
        assert_eq!(topological_order(&stages), Some(vec![0, 1, 2]));
    }

    #[test]
    fn test_cycles_are_detected() {
        let a = ids(2);
        let mutual = vec![
            ParticipantConfig::invited(a[0]).depends_on(a[1]),
            ParticipantConfig::invited(a[1]).depends_on(a[0]),
        ];
        let stages: Vec<_> = mutual.iter().collect();
        assert_eq!(topological_order(&stages), None);

        let selfish = vec![ParticipantConfig::invited(a[0]).depends_on(a[0])];
        let stages: Vec<_> = selfish.iter().collect();
        assert_eq!(topological_order(&stages), None);
    }

    #[test]
    fn test_unknown_dependencies_are_ignored() {
        let configs = vec![ParticipantConfig::invited(Uuid::new_v4()).depends_on(Uuid::new_v4())];
        let stages: Vec<_> = configs.iter().collect();
        assert_eq!(topological_order(&stages), Some(vec![0]));
    }
}
