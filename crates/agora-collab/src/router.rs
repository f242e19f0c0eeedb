//! Expert routing
//!
//! Picks one agent for a query (`route_to_agent`) or a group of agents for a
//! collaboration (`suggest_collaboration`). Both operations degrade to a safe
//! value instead of failing: a routing problem must never fail the request
//! that asked for it.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use agora_core::model::{
    AgentId, AgentProfile, AgentRecommendation, NewRoutingLog, RouteRequest, RoutingDecision,
    RoutingStrategy, UserId,
};
use agora_core::{CollaborationSettings, FeatureFlags, Result, UnitOfWork};

use crate::directory::AgentDirectory;
use crate::routing_log::RoutingLogger;

const CAPABILITY_WEIGHT: f64 = 0.5;
const SPECIALIZATION_WEIGHT: f64 = 0.5;
/// Minimum score of a candidate with at least one textual skill hit
const SKILL_MATCH_FLOOR: f64 = 0.3;
const PERSONALITY_BONUS: f64 = 0.10;
const SPECIALIST_BONUS: f64 = 0.15;

/// Query tone and the personality traits that suit it, checked in order
const TONE_CATEGORIES: [(&[&str], &[&str]); 3] = [
    (
        &["formal", "professional", "official", "report", "business", "kindly"],
        &["formal", "professional", "polite", "courteous"],
    ),
    (
        &["creative", "imagine", "story", "design", "brainstorm", "idea"],
        &["creative", "imaginative", "playful", "artistic"],
    ),
    (
        &["analyze", "analyse", "analysis", "data", "compare", "calculate", "statistics"],
        &["analytical", "logical", "precise", "methodical"],
    ),
];

/// Fraction of `tags` that occur in the (lowercased) query, and the hit count
fn match_ratio(query: &str, tags: &[String]) -> (f64, usize) {
    if tags.is_empty() {
        return (0.0, 0);
    }
    let hits = tags
        .iter()
        .filter(|tag| !tag.is_empty() && query.contains(&tag.to_lowercase()))
        .count();
    (hits as f64 / tags.len() as f64, hits)
}

/// Skill score of a profile for a query, within `[0, 1]`
pub fn calculate_skill_match(query: &str, profile: &AgentProfile) -> f64 {
    let query = query.to_lowercase();
    let (capability_ratio, capability_hits) = match_ratio(&query, &profile.capabilities);
    let (specialization_ratio, specialization_hits) = match_ratio(&query, &profile.specializations);

    let mut score = capability_ratio * CAPABILITY_WEIGHT + specialization_ratio * SPECIALIZATION_WEIGHT;
    if capability_hits > 0 || specialization_hits > 0 {
        score = score.max(SKILL_MATCH_FLOOR);
    }
    score.min(1.0)
}

/// Whether the agent's personality suits the tone of the query
///
/// Only the first tone category found in the query is considered.
pub fn personality_compatible(query: &str, profile: &AgentProfile) -> bool {
    let query = query.to_lowercase();
    let summary = profile.personality_summary.to_lowercase();

    TONE_CATEGORIES
        .iter()
        .find(|(query_words, _)| query_words.iter().any(|w| query.contains(w)))
        .is_some_and(|(_, traits)| traits.iter().any(|t| summary.contains(t)))
}

pub struct AgentRouter {
    directory: AgentDirectory,
    logger: RoutingLogger,
    flags: FeatureFlags,
    alternatives: usize,
}

impl AgentRouter {
    pub fn new(flags: FeatureFlags, settings: CollaborationSettings) -> Self {
        Self {
            directory: AgentDirectory::new(),
            logger: RoutingLogger::new(),
            flags,
            alternatives: settings.router_alternatives,
        }
    }

    /// Select the best agent for a query
    ///
    /// Never fails: a disabled gate or an internal error yields a
    /// zero-confidence decision pointing at the current agent.
    pub async fn route_to_agent(&self, uow: &UnitOfWork<'_>, request: &RouteRequest) -> RoutingDecision {
        if !self.flags.enable_expert_gate {
            return RoutingDecision::no_route(
                request.current_agent_id,
                "Expert routing is disabled; keeping the current agent",
            );
        }

        match self.try_route(uow, request).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Routing failed for user {}: {}", request.user_id, e);
                RoutingDecision::no_route(request.current_agent_id, format!("Routing failed: {}", e))
            }
        }
    }

    async fn try_route(&self, uow: &UnitOfWork<'_>, request: &RouteRequest) -> Result<RoutingDecision> {
        let started = Instant::now();
        let profiles = self.directory.list_agents(uow, request.user_id).await?;

        let candidates: Vec<&AgentProfile> = profiles
            .iter()
            .filter(|p| Some(p.agent_id) != request.current_agent_id)
            .collect();

        if candidates.is_empty() {
            return Ok(match request.current_agent_id {
                Some(current) => RoutingDecision {
                    selected_agent_id: current,
                    confidence: 1.0,
                    reasoning: "Only current agent available.".to_string(),
                    alternatives: Vec::new(),
                },
                None => RoutingDecision::no_route(None, "No agents available for this user"),
            });
        }

        let mut scored: Vec<(&AgentProfile, f64, bool)> = candidates
            .into_iter()
            .map(|profile| {
                let skill = calculate_skill_match(&request.query, profile);
                let compatible = personality_compatible(&request.query, profile);
                let bonus = if compatible { PERSONALITY_BONUS } else { 0.0 };
                (profile, skill + bonus, compatible)
            })
            .collect();
        // stable: ties keep directory order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (best, best_score, compatible) = scored[0];
        let confidence = best_score.min(1.0);
        let alternatives: Vec<AgentId> = scored
            .iter()
            .skip(1)
            .take(self.alternatives)
            .map(|(p, _, _)| p.agent_id)
            .collect();

        let mut reasoning = format!("Selected {} with skill match score {:.2}", best.name, confidence);
        if compatible {
            reasoning.push_str(" (personality matches query tone)");
        }

        let decision = RoutingDecision {
            selected_agent_id: best.agent_id,
            confidence,
            reasoning,
            alternatives,
        };

        let scores: BTreeMap<String, f64> = scored
            .iter()
            .map(|(p, score, _)| (p.agent_id.to_string(), *score))
            .collect();
        let entry = NewRoutingLog {
            conversation_id: request.conversation_id,
            user_message: request.query.clone(),
            selected_agent_id: decision.selected_agent_id,
            scores,
            confidence: decision.confidence,
            strategy: RoutingStrategy::MoeGate,
            latency_ms: started.elapsed().as_millis() as u64,
        };
        if let Err(e) = self.logger.log_routing_decision(uow, entry).await {
            warn!("Failed to log routing decision: {}", e);
        }

        info!(
            agent_id = %decision.selected_agent_id,
            confidence = decision.confidence,
            "Routed query"
        );
        Ok(decision)
    }

    /// Recommend agents for a multi-agent collaboration, best first
    ///
    /// Returns an empty list when disabled, on error, or when fewer than
    /// `min_agents` candidates exist. A non-empty answer is logged with the
    /// `collaboration` strategy, the top pick as the selected agent.
    pub async fn suggest_collaboration(
        &self,
        uow: &UnitOfWork<'_>,
        query: &str,
        user_id: UserId,
        min_agents: usize,
        max_agents: usize,
    ) -> Vec<AgentRecommendation> {
        if !self.flags.enable_collaboration {
            debug!("Collaboration suggestions are disabled");
            return Vec::new();
        }

        match self.try_suggest(uow, query, user_id, min_agents, max_agents).await {
            Ok(recommendations) => recommendations,
            Err(e) => {
                warn!("Collaboration suggestion failed for user {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    async fn try_suggest(
        &self,
        uow: &UnitOfWork<'_>,
        query: &str,
        user_id: UserId,
        min_agents: usize,
        max_agents: usize,
    ) -> Result<Vec<AgentRecommendation>> {
        let started = Instant::now();
        let profiles = self.directory.list_agents(uow, user_id).await?;
        if profiles.len() < min_agents {
            debug!(
                "Only {} agents available, {} needed for collaboration",
                profiles.len(),
                min_agents
            );
            return Ok(Vec::new());
        }

        let mut recommendations: Vec<AgentRecommendation> = profiles
            .into_iter()
            .map(|profile| {
                let skill = calculate_skill_match(query, &profile);
                let specialist = !profile.specializations.is_empty();
                let score = if specialist { skill + SPECIALIST_BONUS } else { skill };
                let reasoning = if specialist {
                    format!(
                        "Skill match {:.2}; specializes in {}",
                        skill,
                        profile.specializations.join(", ")
                    )
                } else {
                    format!("Skill match {:.2}", skill)
                };
                AgentRecommendation {
                    agent_id: profile.agent_id,
                    name: profile.name,
                    score: score.min(1.0),
                    reasoning,
                }
            })
            .collect();
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
        let scores: BTreeMap<String, f64> = recommendations
            .iter()
            .map(|r| (r.agent_id.to_string(), r.score))
            .collect();
        recommendations.truncate(max_agents);

        if let Some(top) = recommendations.first() {
            let entry = NewRoutingLog {
                conversation_id: None,
                user_message: query.to_string(),
                selected_agent_id: top.agent_id,
                scores,
                confidence: top.score,
                strategy: RoutingStrategy::Collaboration,
                latency_ms: started.elapsed().as_millis() as u64,
            };
            if let Err(e) = self.logger.log_routing_decision(uow, entry).await {
                warn!("Failed to log collaboration suggestion: {}", e);
            }
        }
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::Database;
    use agora_core::model::{AgentRecord, Personality};
    use agora_core::testing::SeededTeam;
    use uuid::Uuid;

    fn profile(capabilities: &[&str], specializations: &[&str], summary: &str) -> AgentProfile {
        AgentProfile {
            agent_id: Uuid::new_v4(),
            name: "agent".into(),
            capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
            specializations: specializations.iter().map(|s| s.to_string()).collect(),
            personality_summary: summary.into(),
            avg_response_ms: 0.0,
        }
    }

    fn router(flags: FeatureFlags) -> AgentRouter {
        AgentRouter::new(flags, CollaborationSettings::default())
    }

    #[test]
    fn test_skill_match_floor_for_single_hit() {
        // one of four capabilities: raw 0.125, floored to 0.3
        let p = profile(&["python", "rust", "go", "sql"], &[], "");
        let score = calculate_skill_match("help with python", &p);
        assert!((score - 0.3).abs() < 1e-9);

        let single = profile(&["python"], &[], "");
        assert!(calculate_skill_match("help with python", &single) >= 0.3);
    }

    #[test]
    fn test_skill_match_no_hits_is_zero() {
        let p = profile(&["python"], &["pandas"], "");
        assert_eq!(calculate_skill_match("bake a cake", &p), 0.0);
    }

    #[test]
    fn test_skill_match_caps_at_one() {
        let p = profile(&["python"], &["python"], "");
        assert_eq!(calculate_skill_match("PYTHON please", &p), 1.0);
    }

    #[test]
    fn test_personality_first_category_wins() {
        let creative = profile(&[], &[], "A creative storyteller");
        // "report" is formal and checked before the creative "story"
        assert!(!personality_compatible("write a formal report story", &creative));
        assert!(personality_compatible("tell me a story", &creative));

        let analyst = profile(&[], &[], "Analytical and precise");
        assert!(personality_compatible("analyze this data", &analyst));
        assert!(!personality_compatible("hello there", &analyst));
    }

    #[tokio::test]
    async fn test_flag_off_returns_current_agent_without_directory() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        // a directory query would fail against a missing table
        uow.conn().execute_batch("DROP TABLE team_members;").unwrap();

        let current = Uuid::new_v4();
        let flags = FeatureFlags {
            enable_expert_gate: false,
            ..Default::default()
        };
        let request = RouteRequest::new("help with python", Uuid::new_v4()).with_current_agent(current);
        let decision = router(flags).route_to_agent(&uow, &request).await;
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.selected_agent_id, current);
        assert!(decision.reasoning.contains("disabled"));

        let anonymous = RouteRequest::new("help", Uuid::new_v4());
        let decision = router(flags).route_to_agent(&uow, &anonymous).await;
        assert_eq!(decision.selected_agent_id, Uuid::nil());
    }

    #[tokio::test]
    async fn test_internal_error_degrades_to_zero_confidence() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        uow.conn().execute_batch("DROP TABLE team_members;").unwrap();

        let request = RouteRequest::new("help with python", Uuid::new_v4());
        let decision = router(FeatureFlags::default()).route_to_agent(&uow, &request).await;
        assert_eq!(decision.confidence, 0.0);
        assert!(decision.reasoning.starts_with("Routing failed"));
    }

    #[tokio::test]
    async fn test_routing_is_deterministic_and_logged() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = SeededTeam::create(&uow).unwrap();
        team.agent(&uow, "writer", &["writing"], &[]).unwrap();
        let coder = team.agent(&uow, "coder", &["python", "sql"], &["pandas"]).unwrap();
        team.agent(&uow, "generalist", &[], &[]).unwrap();

        let request = RouteRequest::new("clean this pandas frame with python", team.user_id);
        let r = router(FeatureFlags::default());
        let first = r.route_to_agent(&uow, &request).await;
        let second = r.route_to_agent(&uow, &request).await;

        assert_eq!(first.selected_agent_id, coder.id);
        assert_eq!(first.selected_agent_id, second.selected_agent_id);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.alternatives.len(), 2);

        let logged = uow.routing_log().history(&Default::default()).unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0].strategy, RoutingStrategy::MoeGate);
    }

    #[tokio::test]
    async fn test_ties_keep_directory_order() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = SeededTeam::create(&uow).unwrap();
        let first = team.agent(&uow, "first", &["sql"], &[]).unwrap();
        let second = team.agent(&uow, "second", &["sql"], &[]).unwrap();

        let decision = router(FeatureFlags::default())
            .route_to_agent(&uow, &RouteRequest::new("sql question", team.user_id))
            .await;
        assert_eq!(decision.selected_agent_id, first.id);
        assert_eq!(decision.alternatives, vec![second.id]);
    }

    #[tokio::test]
    async fn test_only_current_agent_available() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = SeededTeam::create(&uow).unwrap();
        let only = team.agent(&uow, "solo", &["python"], &[]).unwrap();

        let request = RouteRequest::new("python", team.user_id).with_current_agent(only.id);
        let decision = router(FeatureFlags::default()).route_to_agent(&uow, &request).await;
        assert_eq!(decision.selected_agent_id, only.id);
        assert_eq!(decision.confidence, 1.0);
        assert_eq!(decision.reasoning, "Only current agent available.");
    }

    #[tokio::test]
    async fn test_personality_bonus_breaks_skill_tie() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = SeededTeam::create(&uow).unwrap();
        team.agent(&uow, "plain", &["data"], &[]).unwrap();
        let analyst = team
            .insert(
                &uow,
                AgentRecord::new(team.team_id, "analyst")
                    .with_shared_skills(["data"])
                    .with_personality(Personality {
                        summary: Some("Analytical thinker".into()),
                        ..Default::default()
                    }),
            )
            .unwrap();

        let decision = router(FeatureFlags::default())
            .route_to_agent(&uow, &RouteRequest::new("analyze my data", team.user_id))
            .await;
        assert_eq!(decision.selected_agent_id, analyst.id);
        assert!((decision.confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_suggest_collaboration_rules() {
        let mut db = Database::in_memory().unwrap();
        let uow = db.begin().unwrap();
        let team = SeededTeam::create(&uow).unwrap();
        let generalist = team.agent(&uow, "generalist", &["python"], &[]).unwrap();

        let r = router(FeatureFlags::default());
        assert!(r.suggest_collaboration(&uow, "python", team.user_id, 2, 4).await.is_empty());

        let specialist = team.agent(&uow, "specialist", &["python"], &["ml"]).unwrap();
        let picks = r.suggest_collaboration(&uow, "python and ml", team.user_id, 2, 4).await;
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].agent_id, specialist.id);
        assert_eq!(picks[1].agent_id, generalist.id);

        let disabled = router(FeatureFlags {
            enable_collaboration: false,
            ..Default::default()
        });
        assert!(disabled.suggest_collaboration(&uow, "python", team.user_id, 2, 4).await.is_empty());

        let capped = r.suggest_collaboration(&uow, "python", team.user_id, 1, 1).await;
        assert_eq!(capped.len(), 1);

        let logged = uow.routing_log().history(&Default::default()).unwrap();
        assert_eq!(logged.len(), 2);
        assert!(logged.iter().all(|l| l.strategy == RoutingStrategy::Collaboration));
        assert_eq!(logged[1].selected_agent_id, specialist.id);
        assert_eq!(logged[1].scores.len(), 2);
    }
}
