use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info, warn};

use search_index_manager::{logging, Dependencies, ManagerError, Settings};
use search_index_repository::ProvisionOutcome;

#[derive(Parser)]
#[command(name = "search-index-manager")]
#[command(about = "Provision, rebuild and inspect search indices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index behind a logical name if it does not exist yet
    Ensure {
        name: String,

        /// JSON file holding the index mapping
        #[arg(short, long)]
        mapping: Option<PathBuf>,
    },
    /// Rebuild a logical index into a new physical index without downtime
    Rebuild {
        name: String,

        /// JSON file holding the mapping for the new index
        #[arg(short, long)]
        mapping: Option<PathBuf>,
    },
    /// Delete a logical index and create it again empty
    Reindex {
        name: String,

        #[arg(short, long)]
        mapping: Option<PathBuf>,
    },
    /// Delete every physical index behind a logical name
    DeleteIndex { name: String },
    /// Count documents, optionally restricted by a JSON query
    Count {
        name: String,

        #[arg(short, long)]
        query: Option<String>,
    },
    /// Check cluster health
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(settings.log_format);

    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, settings: &Settings) -> Result<(), ManagerError> {
    let dependencies = Dependencies::new(settings).await?;
    let client = &dependencies.client;

    match command {
        Commands::Ensure { name, mapping } => {
            match client.ensure_index_with(&name, read_mapping(mapping.as_deref())?).await? {
                ProvisionOutcome::Existing => println!("{} already exists", name),
                ProvisionOutcome::Created(index) => println!("{} -> {}", name, index),
            }
        }
        Commands::Rebuild { name, mapping } => {
            let report = client
                .rebuild_with_mapping(&name, read_mapping(mapping.as_deref())?)
                .await?;
            println!("{}: {} -> {}", report.alias, report.old_index, report.new_index);
            if let Some(stale) = report.stale_index {
                warn!(index = %stale, "Old index was left behind");
                println!("stale index left in place: {}", stale);
            }
        }
        Commands::Reindex { name, mapping } => {
            info!(alias = %name, "Dropping and recreating index");
            if let ProvisionOutcome::Created(index) = client
                .reindex_with_mapping(&name, read_mapping(mapping.as_deref())?)
                .await?
            {
                println!("{} -> {}", name, index);
            }
        }
        Commands::DeleteIndex { name } => {
            for index in client.delete_index(&name).await? {
                println!("deleted {}", index);
            }
        }
        Commands::Count { name, query } => {
            let query = match query {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Value::Null,
            };
            println!("{}", client.count(&name, &query).await?);
        }
        Commands::Health => {
            // Dependencies::new already refused an unhealthy cluster.
            println!("healthy");
        }
    }

    Ok(())
}

fn read_mapping(path: Option<&Path>) -> Result<Option<Value>, ManagerError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}
