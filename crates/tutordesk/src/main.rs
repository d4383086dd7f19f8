// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TutorDesk - student question tracking and SLA escalation for Pachca.
//!
//! This is the binary entry point.

mod check;
mod serve;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tutordesk_config::TutorDeskConfig;

/// TutorDesk - student question tracking and SLA escalation for Pachca.
#[derive(Parser, Debug)]
#[command(name = "tutordesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway and the escalation poller.
    Serve,
    /// Run one escalation cycle and exit.
    Check {
        /// Evaluate the SLA as of this RFC 3339 instant instead of now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Print digests instead of sending them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tutordesk_config::load_and_validate_path(path),
        None => tutordesk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tutordesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Check { at, dry_run }) => check::run_check(config, at, dry_run).await,
        Some(Commands::Config) => {
            print_config(&config);
            Ok(())
        }
        None => {
            println!("tutordesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &TutorDeskConfig) {
    match toml::to_string_pretty(&redacted(config)) {
        Ok(text) => print!("{text}"),
        Err(e) => eprintln!("error: failed to render configuration: {e}"),
    }
}

/// Copy of `config` with every secret replaced by a placeholder.
fn redacted(config: &TutorDeskConfig) -> TutorDeskConfig {
    const MASK: &str = "<redacted>";
    let mut shown = config.clone();
    if shown.pachca.token.is_some() {
        shown.pachca.token = Some(MASK.into());
    }
    if shown.telegram.bot_token.is_some() {
        shown.telegram.bot_token = Some(MASK.into());
    }
    shown
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tutordesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_parses_instant() {
        let cli = Cli::try_parse_from(["tutordesk", "check", "--at", "2025-05-07T12:00:00Z"]).unwrap();
        match cli.command {
            Some(Commands::Check { at, dry_run }) => {
                assert_eq!(at.unwrap().to_rfc3339(), "2025-05-07T12:00:00+00:00");
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tutordesk_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.tracker.queue_key, "BACKLOG");
    }

    #[test]
    fn secrets_are_redacted() {
        let config = tutordesk_config::load_and_validate_str(
            "[pachca]\ntoken = \"secret-1\"\n[telegram]\nbot_token = \"secret-2\"\n",
        )
        .unwrap();
        let text = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!text.contains("secret-1"));
        assert!(!text.contains("secret-2"));
        assert!(text.contains("<redacted>"));
    }
}
