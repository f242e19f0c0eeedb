//! agora: operator tool for the agent collaboration store
//!
//! Usage:
//!   agora --route <user_id> <query...>   - Route a query and log the decision
//!   agora --handoffs <conversation_id>   - Show recent handoffs of a conversation
//!   agora --analyze [days]               - Summarise routing decisions
//!   agora --help                         - Show help

mod commands;

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use agora_core::{Config, Database};

/// Default lookback window of `--analyze`
const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Run mode
enum RunMode {
    Route { user_id: Uuid, query: String },
    Handoffs { conversation_id: Uuid },
    Analyze { days: u32 },
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1).collect())?;

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("agora {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    tracing::debug!("Using database at {}", config.database.db_path);

    let mut db = Database::open(&config.database.db_path)
        .with_context(|| format!("Failed to open database {}", config.database.db_path))?;

    match mode {
        RunMode::Route { user_id, query } => commands::route(&mut db, &config, user_id, &query).await,
        RunMode::Handoffs { conversation_id } => {
            commands::handoffs(&mut db, &config, conversation_id).await
        }
        RunMode::Analyze { days } => commands::analyze(&mut db, days).await,
        RunMode::Help | RunMode::Version => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args(args: Vec<String>) -> anyhow::Result<RunMode> {
    let Some(flag) = args.first() else {
        return Ok(RunMode::Help);
    };

    match flag.as_str() {
        "--route" | "-r" => {
            let Some(user) = args.get(1) else {
                bail!("--route needs a user id and a query");
            };
            let user_id = user.parse().with_context(|| format!("Invalid user id: {}", user))?;
            let query = args[2..].join(" ");
            if query.trim().is_empty() {
                bail!("--route needs a query");
            }
            Ok(RunMode::Route { user_id, query })
        }
        "--handoffs" => {
            let Some(conversation) = args.get(1) else {
                bail!("--handoffs needs a conversation id");
            };
            let conversation_id = conversation
                .parse()
                .with_context(|| format!("Invalid conversation id: {}", conversation))?;
            Ok(RunMode::Handoffs { conversation_id })
        }
        "--analyze" | "-a" => {
            let days = match args.get(1) {
                Some(days) => days
                    .parse()
                    .with_context(|| format!("Invalid number of days: {}", days))?,
                None => DEFAULT_LOOKBACK_DAYS,
            };
            Ok(RunMode::Analyze { days })
        }
        "--help" | "-h" => Ok(RunMode::Help),
        "--version" | "-v" => Ok(RunMode::Version),
        other => bail!("Unknown option: {} (see --help)", other),
    }
}

/// Print help message
fn print_help() {
    println!("agora - agent collaboration operator tool");
    println!();
    println!("Usage:");
    println!("  agora --route <user_id> <query...>   Route a query to the best agent");
    println!("  agora --handoffs <conversation_id>   Show recent handoffs");
    println!("  agora --analyze [days]               Summarise routing decisions (default: 7 days)");
    println!("  agora --help                         Show this help message");
    println!("  agora --version                      Show version");
    println!();
    println!("Configuration is read from ./agora.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  AGORA_DB_PATH          SQLite database path");
    println!("  ENABLE_EXPERT_GATE     Enable expert routing (default: true)");
    println!("  ENABLE_COLLABORATION   Enable collaboration suggestions (default: true)");
    println!("  MAX_DELEGATION_DEPTH   Maximum handoffs per conversation (default: 3)");
    println!("  RUST_LOG               Log filter");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_route_joins_query_words() {
        let user = Uuid::new_v4();
        let mode = parse_args(args(&["--route", &user.to_string(), "help", "with", "python"])).unwrap();
        match mode {
            RunMode::Route { user_id, query } => {
                assert_eq!(user_id, user);
                assert_eq!(query, "help with python");
            }
            _ => panic!("expected route mode"),
        }
    }

    #[test]
    fn test_route_requires_query() {
        let user = Uuid::new_v4().to_string();
        assert!(parse_args(args(&["--route", &user])).is_err());
        assert!(parse_args(args(&["--route", "not-a-uuid", "hi"])).is_err());
    }

    #[test]
    fn test_analyze_default_window() {
        assert!(matches!(
            parse_args(args(&["--analyze"])).unwrap(),
            RunMode::Analyze { days: DEFAULT_LOOKBACK_DAYS }
        ));
        assert!(matches!(
            parse_args(args(&["--analyze", "30"])).unwrap(),
            RunMode::Analyze { days: 30 }
        ));
    }

    #[test]
    fn test_no_args_and_unknown_flags() {
        assert!(matches!(parse_args(Vec::new()).unwrap(), RunMode::Help));
        assert!(parse_args(args(&["--serve"])).is_err());
    }
}
