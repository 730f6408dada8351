// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cortex - context memory and rule prioritization for request pipelines.
//!
//! This is the binary entry point. Every subcommand opens the configured
//! durable store, runs one operation and prints its result.

mod feedback;
mod inspect;
mod pipeline;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use cortex_config::model::CortexConfig;
use cortex_core::CortexError;
use cortex_runtime::Runtime;

/// Cortex - context memory and rule prioritization for request pipelines.
#[derive(Parser, Debug)]
#[command(name = "cortex", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the rule pipeline over a request and print the transformed request.
    Apply {
        /// Session the request belongs to.
        #[arg(long, short)]
        session: String,
        /// Extra trigger to activate, in addition to the detected ones.
        #[arg(long = "trigger")]
        triggers: Vec<String>,
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Request text.
        text: String,
    },
    /// Record a finished request/response exchange in a session's context.
    Record {
        #[arg(long, short)]
        session: String,
        #[arg(long)]
        request: String,
        #[arg(long)]
        response: String,
    },
    /// Show a session's context.
    Context {
        #[arg(long, short)]
        session: String,
        #[arg(long)]
        json: bool,
    },
    /// List rule sets and the active rules in execution order.
    Rules {
        /// Load a rule set by name before listing.
        #[arg(long = "load")]
        load: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Record or list feedback on rule results.
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Subcommand, Debug)]
enum FeedbackAction {
    /// Record a usefulness score between 0 and 1.
    Add {
        score: f64,
        /// Rule the feedback is about, as `<rule_set>:<rule>`.
        #[arg(long)]
        rule: Option<String>,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// List recorded feedback, oldest first.
    List {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => cortex_config::load_and_validate_path(path),
        None => cortex_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            cortex_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.log_level);

    let color = !cli.plain && std::io::stdout().is_terminal();
    match run(cli.command, &config, color).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(e) => {
            if color {
                eprintln!("{}: {e}", "error".red());
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}

/// Runs one subcommand and returns what it prints.
async fn run(
    command: Option<Commands>,
    config: &CortexConfig,
    color: bool,
) -> Result<String, CortexError> {
    let command = match command {
        Some(Commands::Config) => return inspect::render_config(config),
        Some(command) => command,
        None => return Ok("cortex: use --help for available commands".to_string()),
    };
    let runtime = Runtime::open(config).await?;
    execute(&runtime, command, color).await
}

async fn execute(runtime: &Runtime, command: Commands, color: bool) -> Result<String, CortexError> {
    match command {
        Commands::Apply {
            session,
            triggers,
            json,
            text,
        } => pipeline::apply(runtime, &session, &text, &triggers, json, color).await,
        Commands::Record {
            session,
            request,
            response,
        } => pipeline::record(runtime, &session, &request, &response, color).await,
        Commands::Context { session, json } => {
            inspect::context(runtime, &session, json, color).await
        }
        Commands::Rules { load, json } => inspect::rules(runtime, &load, json, color).await,
        Commands::Feedback { action } => match action {
            FeedbackAction::Add {
                score,
                rule,
                session,
                comment,
            } => feedback::add(runtime, score, rule, session, comment, color).await,
            FeedbackAction::List { json } => feedback::list(runtime, json).await,
        },
        Commands::Config => Err(CortexError::Internal(
            "config is handled before the runtime opens".to_string(),
        )),
    }
}

/// Bold heading, or plain text without color.
pub(crate) fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Green on success, red otherwise.
pub(crate) fn status(text: &str, good: bool, color: bool) -> String {
    match (color, good) {
        (false, _) => text.to_string(),
        (true, true) => text.green().to_string(),
        (true, false) => text.red().to_string(),
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so that command output on stdout stays parseable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cortex={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> CortexConfig {
        let mut config = CortexConfig::default();
        config.storage.backend = "memory".to_string();
        config
    }

    #[test]
    fn cli_parses_apply_with_triggers() {
        let cli = Cli::try_parse_from([
            "cortex", "apply", "-s", "s-1", "--trigger", "debugging", "--json", "why?",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Apply {
                session,
                triggers,
                json,
                text,
            }) => {
                assert_eq!(session, "s-1");
                assert_eq!(triggers, ["debugging"]);
                assert!(json);
                assert_eq!(text, "why?");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_feedback_add() {
        let cli = Cli::try_parse_from([
            "cortex", "--plain", "feedback", "add", "0.5", "--rule", "core:session_summary",
        ])
        .unwrap();
        assert!(cli.plain);
        assert!(matches!(
            cli.command,
            Some(Commands::Feedback {
                action: FeedbackAction::Add { rule: Some(_), .. }
            })
        ));
    }

    #[test]
    fn cli_requires_session_for_context() {
        assert!(Cli::try_parse_from(["cortex", "context"]).is_err());
    }

    #[tokio::test]
    async fn config_command_prints_toml() {
        let output = run(Some(Commands::Config), &memory_config(), false)
            .await
            .unwrap();
        assert!(output.contains("[rules]"));
        assert!(output.contains("backend = \"memory\""));
    }

    #[tokio::test]
    async fn no_command_prints_hint() {
        let output = run(None, &memory_config(), false).await.unwrap();
        assert!(output.contains("--help"));
    }

    #[test]
    fn plain_styles_are_unchanged() {
        assert_eq!(heading("Rules", false), "Rules");
        assert_eq!(status("ok", false, false), "ok");
    }
}
