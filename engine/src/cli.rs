//! CLI interface for Swarm
//!
//! Command-line interface built with clap's derive API.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RoutingPolicyKind;

/// Study Swarm
///
/// A study assistant that routes each question to a specialist: web search,
/// document Q&A, code execution, video analysis or general chat. It remembers
/// facts you tell it about yourself.
#[derive(Parser, Debug)]
#[command(name = "swarm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by `chat` and `ask`
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// PDF (or text) document to answer questions about
    #[arg(long, value_name = "PATH")]
    pub pdf: Option<PathBuf>,

    /// Video to answer questions about
    #[arg(long, value_name = "PATH")]
    pub video: Option<PathBuf>,

    /// Grade every answer with a second judge call
    #[arg(long)]
    pub judge: bool,

    /// Routing policy (overrides router.policy)
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<RoutingPolicyKind>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive study session
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Ask a single question and exit
    Ask {
        /// The question
        query: String,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Manage remembered facts
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Manage the API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Memory management actions
#[derive(Subcommand, Debug)]
pub enum MemoryAction {
    /// List stored facts
    List,

    /// Store a fact
    Add {
        /// Fact text, stored verbatim
        fact: String,
    },

    /// Delete a fact (exact match)
    Delete {
        /// Fact text
        fact: String,
    },

    /// Delete every stored fact
    Clear,
}

/// API key actions
#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store the API key in the OS keychain (read from stdin)
    Set,

    /// Show where the API key is found
    Status,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_with_flags() {
        let cli = Cli::parse_from([
            "swarm", "--json", "ask", "What is entropy?", "--pdf", "notes.pdf", "--policy",
            "keyword",
        ]);

        assert!(cli.json);
        match cli.command {
            Command::Ask { query, session } => {
                assert_eq!(query, "What is entropy?");
                assert_eq!(session.pdf, Some(PathBuf::from("notes.pdf")));
                assert_eq!(session.policy, Some(RoutingPolicyKind::Keyword));
                assert!(!session.judge);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_memory_delete() {
        let cli = Cli::parse_from(["swarm", "memory", "delete", "I like tea"]);
        assert!(matches!(
            cli.command,
            Command::Memory {
                action: MemoryAction::Delete { ref fact }
            } if fact == "I like tea"
        ));
    }
}
