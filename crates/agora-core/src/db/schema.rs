//! Table definitions
//!
//! UUIDs and JSON blobs are TEXT; timestamps are RFC 3339 strings with
//! nanosecond precision so lexical order matches time order.

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    team_id TEXT NOT NULL REFERENCES teams(id),
    user_id TEXT NOT NULL,
    joined_at TEXT NOT NULL,
    PRIMARY KEY (team_id, user_id)
);

CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL REFERENCES teams(id),
    name TEXT NOT NULL,
    tagline TEXT,
    shared_skills TEXT NOT NULL DEFAULT '[]',
    custom_skills TEXT NOT NULL DEFAULT '[]',
    disabled_skills TEXT NOT NULL DEFAULT '[]',
    personality TEXT NOT NULL DEFAULT '{}',
    model_config TEXT NOT NULL DEFAULT '{}',
    boundaries TEXT NOT NULL DEFAULT '{}',
    status TEXT NOT NULL DEFAULT 'active',
    avg_response_ms REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agents_team ON agents(team_id, status);

CREATE TABLE IF NOT EXISTS agent_handoffs (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    from_agent_id TEXT NOT NULL,
    to_agent_id TEXT NOT NULL,
    reason TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '{}',
    handoff_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_handoffs_conversation ON agent_handoffs(conversation_id, handoff_at);

CREATE TABLE IF NOT EXISTS agent_tasks (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    priority INTEGER NOT NULL,
    assigned_to_agent_id TEXT NOT NULL,
    created_by_agent_id TEXT NOT NULL,
    parent_task_id TEXT REFERENCES agent_tasks(id),
    delegation_depth INTEGER NOT NULL,
    result TEXT,
    error TEXT,
    timeout_seconds INTEGER NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON agent_tasks(assigned_to_agent_id, status);
CREATE INDEX IF NOT EXISTS idx_tasks_parent ON agent_tasks(parent_task_id);

CREATE TABLE IF NOT EXISTS agent_messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    from_agent_id TEXT NOT NULL,
    to_agent_id TEXT NOT NULL,
    message_type TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL,
    read_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_recipient ON agent_messages(to_agent_id, read_at);

CREATE TABLE IF NOT EXISTS collaboration_sessions (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    pattern TEXT,
    goal TEXT NOT NULL,
    status TEXT NOT NULL,
    total_cost REAL NOT NULL DEFAULT 0,
    total_duration_ms INTEGER NOT NULL DEFAULT 0,
    metadata TEXT,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    final_result TEXT
);

CREATE TABLE IF NOT EXISTS collaboration_participants (
    session_id TEXT NOT NULL REFERENCES collaboration_sessions(id),
    agent_id TEXT NOT NULL,
    role TEXT NOT NULL,
    contribution TEXT,
    turn_count INTEGER NOT NULL DEFAULT 0,
    cost REAL NOT NULL DEFAULT 0,
    joined_at TEXT NOT NULL,
    UNIQUE (session_id, agent_id)
);

CREATE TABLE IF NOT EXISTS collaboration_stages (
    session_id TEXT NOT NULL REFERENCES collaboration_sessions(id),
    seq INTEGER NOT NULL,
    stage TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    output TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    PRIMARY KEY (session_id, seq)
);

CREATE TABLE IF NOT EXISTS routing_decision_logs (
    id TEXT PRIMARY KEY,
    conversation_id TEXT,
    user_message TEXT NOT NULL,
    selected_agent_id TEXT NOT NULL,
    scores TEXT NOT NULL DEFAULT '{}',
    confidence REAL NOT NULL,
    strategy TEXT NOT NULL,
    latency_ms INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_routing_created ON routing_decision_logs(created_at);

CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL,
    agent_id TEXT,
    memory_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    content TEXT NOT NULL,
    importance REAL NOT NULL DEFAULT 0.5,
    metadata TEXT,
    embedding TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memories_team ON memories(team_id, memory_type, status);
"#;
