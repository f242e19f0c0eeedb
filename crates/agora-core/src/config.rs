//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `agora.toml` configuration file
//! 3. Default values
//!
//! `${VAR_NAME}` references inside the configuration file are expanded
//! from the environment before parsing.
//!
//! The resulting [`Config`] is immutable; components receive the pieces they
//! consult ([`FeatureFlags`], [`CollaborationSettings`]) at construction.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Default configuration file name looked up by [`Config::load`]
pub const CONFIG_FILE: &str = "agora.toml";

/// Feature toggles consulted by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Run skill/personality routing (otherwise routing is a no-op)
    pub enable_expert_gate: bool,
    /// Produce multi-agent collaboration recommendations
    pub enable_collaboration: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_expert_gate: true,
            enable_collaboration: true,
        }
    }
}

/// Limits and thresholds of the collaboration subsystem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollaborationSettings {
    /// Maximum handoffs per conversation and maximum task delegation depth
    pub max_delegation_depth: u32,
    /// Cosine similarity at or above which team knowledge is a duplicate
    pub dedup_threshold: f32,
    /// Truncation applied to messages copied into handoff routing logs
    pub max_logged_message_chars: usize,
    /// Timeout assigned to delegated tasks when none is given
    pub default_task_timeout_secs: u64,
    /// Number of runner-up agents reported with a routing decision
    pub router_alternatives: usize,
}

impl Default for CollaborationSettings {
    fn default() -> Self {
        Self {
            max_delegation_depth: 3,
            dedup_threshold: 0.92,
            max_logged_message_chars: 1000,
            default_task_timeout_secs: 300,
            router_alternatives: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub db_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "data/agora.db".to_string()
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub features: FeatureFlags,
    pub collaboration: CollaborationSettings,
}

impl Config {
    /// Expand `${VAR_NAME}` references with environment values.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parse configuration from TOML text (environment references expanded)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Self::from_toml_config(toml)
    }

    /// Load from `./agora.toml` if present, otherwise from the environment only
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Self::from_env()
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn from_toml_config(toml: TomlConfig) -> crate::Result<Self> {
        let defaults = CollaborationSettings::default();
        let flags = FeatureFlags::default();

        let database = toml.database.unwrap_or_default();
        let features = toml.features.unwrap_or_default();
        let collab = toml.collaboration.unwrap_or_default();

        let collaboration = CollaborationSettings {
            max_delegation_depth: collab
                .max_delegation_depth
                .unwrap_or(defaults.max_delegation_depth),
            dedup_threshold: collab.dedup_threshold.unwrap_or(defaults.dedup_threshold),
            max_logged_message_chars: collab
                .max_logged_message_chars
                .unwrap_or(defaults.max_logged_message_chars),
            default_task_timeout_secs: collab
                .default_task_timeout_secs
                .unwrap_or(defaults.default_task_timeout_secs),
            router_alternatives: collab
                .router_alternatives
                .unwrap_or(defaults.router_alternatives),
        };

        if !(0.0..=1.0).contains(&collaboration.dedup_threshold) {
            return Err(Error::Config(format!(
                "dedup_threshold must be within [0, 1], got {}",
                collaboration.dedup_threshold
            )));
        }

        Ok(Config {
            database: DatabaseConfig {
                db_path: database.db_path.unwrap_or_else(default_db_path),
            },
            features: FeatureFlags {
                enable_expert_gate: features
                    .enable_expert_gate
                    .unwrap_or(flags.enable_expert_gate),
                enable_collaboration: features
                    .enable_collaboration
                    .unwrap_or(flags.enable_collaboration),
            },
            collaboration,
        })
    }

    /// Environment variables take precedence over file values
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("AGORA_DB_PATH") {
            if !path.is_empty() {
                self.database.db_path = path;
            }
        }

        if let Ok(enabled) = std::env::var("ENABLE_EXPERT_GATE") {
            self.features.enable_expert_gate = enabled.to_lowercase() != "false";
        }
        if let Ok(enabled) = std::env::var("ENABLE_COLLABORATION") {
            self.features.enable_collaboration = enabled.to_lowercase() != "false";
        }

        if let Ok(depth) = std::env::var("MAX_DELEGATION_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.collaboration.max_delegation_depth = d;
            }
        }
    }
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    database: Option<TomlDatabaseConfig>,
    features: Option<TomlFeatureConfig>,
    collaboration: Option<TomlCollaborationConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDatabaseConfig {
    #[serde(default)]
    db_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlFeatureConfig {
    #[serde(default)]
    enable_expert_gate: Option<bool>,
    #[serde(default)]
    enable_collaboration: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlCollaborationConfig {
    #[serde(default)]
    max_delegation_depth: Option<u32>,
    #[serde(default)]
    dedup_threshold: Option<f32>,
    #[serde(default)]
    max_logged_message_chars: Option<usize>,
    #[serde(default)]
    default_task_timeout_secs: Option<u64>,
    #[serde(default)]
    router_alternatives: Option<usize>,
}
