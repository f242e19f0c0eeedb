//! Agent invocation seam
//!
//! The collaboration core never talks to a model directly. Everything that
//! "asks an agent" goes through [`AgentRunner`], so the orchestrator and the
//! task executor can be driven by a real LLM client or by [`SimulatedRunner`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agora_core::Result;
use agora_core::model::AgentId;

/// Token accounting of one agent call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Output of one agent call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub text: String,
    pub usage: TokenUsage,
    pub cost: f64,
}

#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Ask an agent to respond to `prompt`
    async fn run(&self, agent_id: AgentId, prompt: &str) -> Result<AgentRun>;
}

/// Deterministic runner that echoes the prompt back, tagged with the agent id
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedRunner;

#[async_trait]
impl AgentRunner for SimulatedRunner {
    async fn run(&self, agent_id: AgentId, prompt: &str) -> Result<AgentRun> {
        let words = prompt.split_whitespace().count() as u64;
        Ok(AgentRun {
            text: format!("[agent {}] {}", agent_id, prompt),
            usage: TokenUsage {
                input_tokens: words,
                output_tokens: words + 2,
            },
            cost: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_simulated_runner_is_deterministic() {
        let agent = Uuid::new_v4();
        let first = tokio_test::block_on(SimulatedRunner.run(agent, "draft the plan")).unwrap();
        let second = tokio_test::block_on(SimulatedRunner.run(agent, "draft the plan")).unwrap();
        assert_eq!(first, second);
        assert!(first.text.contains("draft the plan"));
        assert!(first.text.contains(&agent.to_string()));
        assert_eq!(first.usage.input_tokens, 3);
    }
}
