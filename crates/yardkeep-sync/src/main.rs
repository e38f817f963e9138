//! Yardkeep Sync Binary
//!
//! Pushes the local inventory and command log into SharePoint lists.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use yardkeep_core::{Command, Inventory, JsonFileStore, Part, PartChanges};
use yardkeep_sync::{Replicator, SharePointClient, SyncConfig, SyncError};

#[derive(Parser)]
#[command(name = "yardkeep-sync", version, about = "Replicate yardkeep data into SharePoint lists")]
struct Cli {
    /// Path to the TOML config (default: <config dir>/yardkeep/sync.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the data directory holding inventory.json and commands.json
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push every part and command that has no remote id yet
    Import,

    /// Create a new part remotely and locally
    AddPart {
        #[arg(long)]
        part_number: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        quantity: u64,
        #[arg(long)]
        yard: Option<String>,
    },

    /// Change fields of an already-synced part
    UpdatePart {
        #[arg(long)]
        part_number: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        quantity: Option<u64>,
        #[arg(long)]
        yard: Option<String>,
    },

    /// Record a quantity change remotely and apply it locally
    LogCommand {
        #[arg(long)]
        part_number: String,
        #[arg(long, allow_hyphen_values = true)]
        quantity_change: i64,
        #[arg(long)]
        yard: String,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), SyncError> {
    let mut config = SyncConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let inventory = Inventory::new(JsonFileStore::new(config.store()));
    let client = SharePointClient::connect(config).await?;
    let mut replicator = Replicator::new(inventory, client);

    match cli.command {
        Commands::Import => {
            let report = replicator.import().await?;
            println!(
                "Created {} part items and {} command items ({} already synced)",
                report.parts_created, report.commands_created, report.already_synced
            );
            for failure in &report.failures {
                let retry = if failure.transient { " (transient, rerun import)" } else { "" };
                println!(
                    "  Failed to create {} for {}: {}{}",
                    failure.list, failure.part_number, failure.message, retry
                );
            }
        }
        Commands::AddPart {
            part_number,
            description,
            quantity,
            yard,
        } => {
            let mut part = Part::new(part_number, description, quantity);
            part.yard = yard;
            let part = replicator.add_part(part).await?;
            println!(
                "Created part {} (remote id {})",
                part.part_number,
                part.remote_id.unwrap_or_default()
            );
        }
        Commands::UpdatePart {
            part_number,
            description,
            quantity,
            yard,
        } => {
            let changes = PartChanges {
                description,
                quantity_on_hand: quantity,
                yard,
            };
            let part = replicator.update_part(&part_number, &changes).await?;
            println!(
                "Updated part {}: {} on hand",
                part.part_number, part.quantity_on_hand
            );
        }
        Commands::LogCommand {
            part_number,
            quantity_change,
            yard,
            user,
            description,
            remarks,
        } => {
            let command = Command {
                part_number,
                description,
                quantity_change,
                yard,
                user,
                remarks,
                timestamp: chrono::Utc::now().timestamp_millis(),
                remote_id: None,
            };
            let result = replicator.log_command(command).await?;
            println!(
                "Logged command for {} (remote id {}); {} on hand",
                result.command.part_number,
                result.command.remote_id.unwrap_or_default(),
                result.part.quantity_on_hand
            );
        }
    }

    Ok(())
}
