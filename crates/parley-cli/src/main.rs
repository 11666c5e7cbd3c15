//! parley: command-line client for the chat and call session core.
//!
//! Reads `config.toml` from the platform config directory (or `--config`),
//! then connects to the signaling server and the session registry.

mod commands;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use parley_common::ParleyError;
use parley_config::{config_to_json, ParleyConfig};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "parley", about = "Real-time chat and call session client")]
struct Args {
    /// Config file to use instead of the platform default.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `parley_session=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect and print connectivity and inbound events until Ctrl-C.
    Watch,
    /// Print the ordered history of a conversation.
    History { conversation: String },
    /// Persist a message and broadcast it to the conversation.
    Send {
        conversation: String,
        content: String,
    },
    /// Print the default config file location.
    ConfigPath,
    /// Print the effective config as JSON, token masked.
    ConfigShow,
}

fn load(path: Option<&PathBuf>) -> Result<ParleyConfig, ParleyError> {
    let config = match path {
        Some(path) => parley_config::load_from_path(path)?,
        None => parley_config::load_config()?,
    };
    Ok(config)
}

/// `--log-level` wins, then `RUST_LOG`, then the config file.
fn init_logging(flag: Option<&str>, config: &ParleyConfig) {
    let filter = match flag {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_filter())),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: Args) -> Result<(), ParleyError> {
    if let Command::ConfigPath = args.command {
        println!("{}", parley_config::default_config_path()?.display());
        return Ok(());
    }

    let config = load(args.config.as_ref())?;
    init_logging(args.log_level.as_deref(), &config);
    let settings = Settings::from_config(&config);

    match args.command {
        Command::Watch => commands::watch(&settings).await,
        Command::History { conversation } => commands::history(&settings, &conversation).await,
        Command::Send {
            conversation,
            content,
        } => commands::send(&settings, &conversation, &content).await,
        Command::ConfigShow => {
            println!("{}", config_to_json(&config));
            Ok(())
        }
        Command::ConfigPath => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "parley failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
