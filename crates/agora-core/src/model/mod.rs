//! Shared data model of the collaboration subsystem
//!
//! Identifiers are random v4 UUIDs with no ordering semantics.

mod agent;
mod collaboration;
mod handoff;
mod memory;
mod message;
mod routing;
mod task;

pub use agent::{
    AgentAvailability, AgentProfile, AgentRecord, AgentStatus, Boundaries, ModelConfig,
    Personality,
};
pub use collaboration::{
    CollaborationParticipant, CollaborationPattern, CollaborationSession, CreateSessionRequest,
    ParticipantConfig, ParticipantRole, SessionStatus, StageOutput, StatusUpdateRequest,
};
pub use handoff::{AgentHandoff, HandoffRequest, HandoffResult};
pub use memory::{
    Memory, MemoryStatus, MemorySummary, MemoryType, NewMemory, cosine_similarity,
};
pub use message::{AgentMessage, MessageType, OutgoingMessage};
pub use routing::{
    AgentRecommendation, AgentRoutingStats, NewRoutingLog, RouteRequest, RoutingAnalysis,
    RoutingDecision, RoutingDecisionLog, RoutingHistoryFilter, RoutingStrategy,
};
pub use task::{AgentTask, DEFAULT_TASK_PRIORITY, DelegationRequest, TaskStatus};

pub type AgentId = uuid::Uuid;
pub type TeamId = uuid::Uuid;
pub type UserId = uuid::Uuid;
pub type ConversationId = uuid::Uuid;
pub type TaskId = uuid::Uuid;
pub type SessionId = uuid::Uuid;
pub type MessageId = uuid::Uuid;
