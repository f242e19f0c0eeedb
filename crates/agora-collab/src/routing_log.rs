//! Routing decision log and aggregate reporting

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use agora_core::model::{
    AgentId, AgentRoutingStats, NewRoutingLog, RoutingAnalysis, RoutingDecisionLog,
    RoutingHistoryFilter,
};
use agora_core::{Result, UnitOfWork};

#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingLogger;

impl RoutingLogger {
    pub fn new() -> Self {
        Self
    }

    /// Append a decision; every call creates a new row
    pub async fn log_routing_decision(
        &self,
        uow: &UnitOfWork<'_>,
        entry: NewRoutingLog,
    ) -> Result<RoutingDecisionLog> {
        let log = uow.routing_log().append(entry)?;
        debug!(
            strategy = %log.strategy,
            agent_id = %log.selected_agent_id,
            confidence = log.confidence,
            "Logged routing decision"
        );
        Ok(log)
    }

    /// Filtered history, newest first
    pub async fn get_decision_history(
        &self,
        uow: &UnitOfWork<'_>,
        filter: &RoutingHistoryFilter,
    ) -> Result<Vec<RoutingDecisionLog>> {
        uow.routing_log().history(filter)
    }

    /// Aggregate the decisions of the last `lookback_days` days
    pub async fn analyze_routing_patterns(
        &self,
        uow: &UnitOfWork<'_>,
        lookback_days: u32,
    ) -> Result<RoutingAnalysis> {
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let logs = uow.routing_log().since(cutoff)?;

        let mut analysis = RoutingAnalysis {
            lookback_days,
            ..Default::default()
        };
        if logs.is_empty() {
            return Ok(analysis);
        }

        let total = logs.len() as f64;
        analysis.total_decisions = logs.len() as u64;
        analysis.avg_confidence = logs.iter().map(|l| l.confidence).sum::<f64>() / total;
        analysis.avg_latency_ms = logs.iter().map(|l| l.latency_ms as f64).sum::<f64>() / total;

        let mut per_agent: BTreeMap<AgentId, (u64, f64)> = BTreeMap::new();
        for log in &logs {
            let entry = per_agent.entry(log.selected_agent_id).or_default();
            entry.0 += 1;
            entry.1 += log.confidence;
            *analysis
                .strategies
                .entry(log.strategy.as_str().to_string())
                .or_default() += 1;
        }

        let mut agents: Vec<AgentRoutingStats> = per_agent
            .into_iter()
            .map(|(agent_id, (count, confidence_sum))| AgentRoutingStats {
                agent_id,
                decision_count: count,
                avg_confidence: confidence_sum / count as f64,
                success_rate: count as f64 / total,
            })
            .collect();
        agents.sort_by(|a, b| b.decision_count.cmp(&a.decision_count));
        analysis.agents = agents;

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::Database;
    use agora_core::model::RoutingStrategy;
    use uuid::Uuid;

    fn entry(agent: AgentId, confidence: f64, strategy: RoutingStrategy, latency_ms: u64) -> NewRoutingLog {
        NewRoutingLog {
            conversation_id: None,
            user_message: "hello".into(),
            selected_agent_id: agent,
            scores: BTreeMap::new(),
            confidence,
            strategy,
            latency_ms,
        }
    }

    #[tokio::test]
    async fn test_empty_window_is_zeroed() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let analysis = RoutingLogger.analyze_routing_patterns(&uow, 7).await.unwrap();
        assert_eq!(analysis.total_decisions, 0);
        assert_eq!(analysis.avg_confidence, 0.0);
        assert!(analysis.agents.is_empty());
        assert_eq!(analysis.lookback_days, 7);
    }

    #[tokio::test]
    async fn test_unbounded_lookback_covers_everything() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        RoutingLogger
            .log_routing_decision(&uow, entry(Uuid::new_v4(), 0.5, RoutingStrategy::MoeGate, 3))
            .await
            .unwrap();

        let analysis = RoutingLogger
            .analyze_routing_patterns(&uow, u32::MAX)
            .await
            .unwrap();
        assert_eq!(analysis.total_decisions, 1);
        assert_eq!(analysis.lookback_days, u32::MAX);
    }

    #[tokio::test]
    async fn test_analysis_per_agent_frequency() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        for (agent, conf) in [(a, 0.8), (a, 0.6), (a, 1.0), (b, 0.4)] {
            RoutingLogger
                .log_routing_decision(&uow, entry(agent, conf, RoutingStrategy::MoeGate, 10))
                .await
                .unwrap();
        }
        RoutingLogger
            .log_routing_decision(&uow, entry(b, 1.0, RoutingStrategy::Handoff, 0))
            .await
            .unwrap();

        let analysis = RoutingLogger.analyze_routing_patterns(&uow, 7).await.unwrap();
        assert_eq!(analysis.total_decisions, 5);
        assert!((analysis.avg_latency_ms - 8.0).abs() < 1e-9);
        assert_eq!(analysis.strategies.get("moe_gate"), Some(&4));
        assert_eq!(analysis.strategies.get("handoff"), Some(&1));

        let top = &analysis.agents[0];
        assert_eq!(top.agent_id, a);
        assert_eq!(top.decision_count, 3);
        assert!((top.avg_confidence - 0.8).abs() < 1e-9);
        assert!((top.success_rate - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_history_is_append_only_and_descending() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let agent = Uuid::new_v4();
        let conversation = Uuid::new_v4();

        for confidence in [0.1, 0.2, 0.3] {
            let mut e = entry(agent, confidence, RoutingStrategy::MoeGate, 1);
            e.conversation_id = Some(conversation);
            RoutingLogger.log_routing_decision(&uow, e).await.unwrap();
        }
        RoutingLogger
            .log_routing_decision(&uow, entry(Uuid::new_v4(), 0.9, RoutingStrategy::MoeGate, 1))
            .await
            .unwrap();

        let filter = RoutingHistoryFilter {
            conversation_id: Some(conversation),
            ..Default::default()
        };
        let history = RoutingLogger.get_decision_history(&uow, &filter).await.unwrap();
        let confidences: Vec<f64> = history.iter().map(|l| l.confidence).collect();
        assert_eq!(confidences, vec![0.3, 0.2, 0.1]);

        let by_agent = RoutingHistoryFilter {
            agent_id: Some(agent),
            limit: 2,
            ..Default::default()
        };
        assert_eq!(RoutingLogger.get_decision_history(&uow, &by_agent).await.unwrap().len(), 2);
    }
}
