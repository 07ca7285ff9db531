//! sparkscope — Spark history server diagnostics.
//!
//! # Usage
//!
//! ```text
//! sparkscope fetch --config sparkscope.toml
//! sparkscope apps
//! sparkscope analyze app-20201023123456-0001 --format json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_LOG_FILTER: &str = "info,sparkscope=debug";

#[derive(Parser)]
#[command(
    name = "sparkscope",
    about = "Sparkscope — diagnostics for Spark applications",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file. Defaults apply when omitted and ./sparkscope.toml is absent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest newly completed applications from the history server.
    Fetch {
        /// Fetch the newest `testing.apps_number` applications instead of
        /// everything past the stored watermark. Meant for an empty store.
        #[arg(long)]
        test_mode: bool,
    },
    /// Run every analyzer against one stored application.
    Analyze {
        app_id: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List stored applications with their overall severity.
    Apps,
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Fetch { test_mode } => commands::fetch::fetch(&config, test_mode).await,
        Commands::Analyze { app_id, format } => commands::analyze::analyze(&config, &app_id, format),
        Commands::Apps => commands::apps::apps(&config),
        Commands::Config => commands::show_config(&config),
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_LOG_FILTER)?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
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
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "sparkscope",
            "analyze",
            "app-1",
            "--format",
            "json",
            "--config",
            "/etc/sparkscope.toml",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/sparkscope.toml")));
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Analyze { app_id, format } => {
                assert_eq!(app_id, "app-1");
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn fetch_defaults_to_incremental() {
        let cli = Cli::parse_from(["sparkscope", "fetch"]);
        assert!(matches!(cli.command, Commands::Fetch { test_mode: false }));
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.config.is_none());
    }
}
