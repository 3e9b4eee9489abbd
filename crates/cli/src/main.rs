//! Keystone CLI - drive a session against an identity service

mod commands;
mod config;
mod session_file;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::{Commands, print_json};
use keystone_core::tracing::InstrumentationConfig;
use keystone_core::tracing::init::init_tracing;
use session_file::SessionFile;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "Session lifecycle client for a Keystone identity service")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (TOML); KEYSTONE_* environment variables override it
    #[arg(short = 'c', long, global = true, env = "KEYSTONE_CONFIG")]
    config: Option<PathBuf>,

    /// Identity service base URL, overrides the configuration
    #[arg(short = 'u', long, global = true)]
    base_url: Option<String>,

    /// Where the session proof is kept between runs
    /// (defaults to KEYSTONE_STATE_DIR/session.json)
    #[arg(long, global = true, env = "KEYSTONE_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&InstrumentationConfig {
        service_name: "keystone-cli".to_string(),
        log_level: cli.log_level.as_filter().to_string(),
        json: cli.json_logs,
    })?;

    let mut client_config = config::load_config(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        client_config.base_url = base_url;
        client_config.validate()?;
    }
    info!(base_url = %client_config.base_url, "using identity service");

    let session_file = SessionFile::new(cli.session_file.unwrap_or_else(SessionFile::default_path));
    info!(path = %session_file.path().display(), "using session file");

    match cli.command.execute(&client_config, &session_file).await {
        Ok(report) => {
            print_json(&report)?;
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_filter(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}
