mod commands_cmd;
mod doctor_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use clawcord_config::{config_dir, config_file_path, load_and_prepare};
use clawcord_http::RestClient;

use commands_cmd::CommandsCommand;
use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "clawcord")]
#[command(about = "clawcord: manage registered application commands")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.clawcord/clawcord.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or prune registered commands
    #[command(subcommand)]
    Commands(CommandsCommand),
    /// Check the config and environment
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Doctor => {
            if !doctor_cmd::run(&path).await? {
                std::process::exit(1);
            }
        }
        Commands::Commands(cmd) => {
            let (config, report) = load_and_prepare(&path).await?;
            let level = config
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or_else(|| "warn".to_string());
            clawcord_logging::init_console_logger(&level);

            if !report.is_valid() {
                for error in &report.errors {
                    note_error(&error.to_string());
                }
                anyhow::bail!("Invalid config at {}", path.display());
            }

            let app = config.application.context("Missing application section")?;
            let app_id = app.id.context("Missing application.id")?;
            let token = app.token.context("Missing application.token")?;
            let mut client = RestClient::new(token);
            if let Some(url) = app.api_base_url {
                client = client.with_base_url(url);
            }
            debug!(app_id = %app_id, base_url = %client.base_url(), "Using REST client");

            commands_cmd::run(cmd, &client, app_id).await?;
        }
    }

    Ok(())
}
