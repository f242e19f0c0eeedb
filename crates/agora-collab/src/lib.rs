//! agora-collab: agent routing and multi-agent collaboration
//!
//! Every component is a plain value holding its configuration. Methods take
//! the caller's [`agora_core::UnitOfWork`] by reference and never commit it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agora_collab::{CollaborationOrchestrator, SimulatedRunner};
//! use agora_core::{Config, Database, SqliteMemoryRepository};
//!
//! let config = Config::load()?;
//! let mut db = Database::open(&config.database.db_path)?;
//! let orchestrator = CollaborationOrchestrator::new(
//!     config.collaboration,
//!     Arc::new(SqliteMemoryRepository::new()),
//!     Arc::new(SimulatedRunner),
//! );
//!
//! let uow = db.begin()?;
//! let session = orchestrator.orchestrate_collaboration(&uow, request).await?;
//! uow.commit()?;
//! ```

pub mod delegation;
pub mod directory;
pub mod executor;
pub mod handoff;
pub mod message_bus;
pub mod multi_agent;
pub mod orchestrator;
pub mod router;
pub mod routing_log;
pub mod runner;
pub mod team_memory;

pub use delegation::DelegationManager;
pub use directory::AgentDirectory;
pub use executor::TaskExecutor;
pub use handoff::{HandoffManager, USER_MESSAGE_KEY};
pub use message_bus::AgentMessageBus;
pub use multi_agent::MultiAgentManager;
pub use orchestrator::CollaborationOrchestrator;
pub use router::{AgentRouter, calculate_skill_match, personality_compatible};
pub use routing_log::RoutingLogger;
pub use runner::{AgentRun, AgentRunner, SimulatedRunner, TokenUsage};
pub use team_memory::{TeamBroadcast, TeamKnowledge, TeamMemoryBus};
