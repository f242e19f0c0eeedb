//! Operator commands
//!
//! Each command opens one unit of work. Commands that write (routing logs
//! a decision) commit it; read-only commands let it roll back on drop.

use uuid::Uuid;

use agora_collab::{AgentRouter, HandoffManager, RoutingLogger};
use agora_core::model::RouteRequest;
use agora_core::{Config, Database};

/// Route a query for a user and print the decision
pub async fn route(db: &mut Database, config: &Config, user_id: Uuid, query: &str) -> anyhow::Result<()> {
    let router = AgentRouter::new(config.features, config.collaboration);
    let uow = db.begin()?;

    let decision = router
        .route_to_agent(&uow, &RouteRequest::new(query, user_id))
        .await;
    uow.commit()?;

    tracing::info!(
        "Routed to {} with confidence {:.2}",
        decision.selected_agent_id,
        decision.confidence
    );
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

/// Print the most recent handoffs of a conversation
pub async fn handoffs(db: &mut Database, config: &Config, conversation_id: Uuid) -> anyhow::Result<()> {
    let manager = HandoffManager::new(config.collaboration);
    let uow = db.begin()?;

    let history = manager.get_handoff_history(&uow, conversation_id, 50).await?;
    if history.is_empty() {
        println!("No handoffs recorded for {}", conversation_id);
        return Ok(());
    }

    for handoff in &history {
        println!(
            "{}  {} -> {}  {}",
            handoff.handoff_at.to_rfc3339(),
            handoff.from_agent_id,
            handoff.to_agent_id,
            handoff.reason
        );
    }
    println!(
        "{} of {} allowed handoffs used",
        uow.handoffs().count_for_conversation(conversation_id)?,
        config.collaboration.max_delegation_depth
    );
    Ok(())
}

/// Print aggregate routing statistics
pub async fn analyze(db: &mut Database, days: u32) -> anyhow::Result<()> {
    let uow = db.begin()?;
    let analysis = RoutingLogger::new().analyze_routing_patterns(&uow, days).await?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
