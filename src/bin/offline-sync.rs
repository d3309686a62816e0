use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use offline_sync::{
    config::SyncConfig,
    persist::StoreHandle,
    record::QueueDraft,
    replay::replay_pass,
    transport::ReqwestTransport,
};
use tracing_subscriber::EnvFilter;

/// Inspect and drain the offline write queue.
#[derive(Debug, Parser)]
#[command(name = "offline-sync", version)]
struct Cli {
    /// JSON config file.
    #[arg(long, env = "OFFLINE_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Queue database, overriding the config.
    #[arg(long, env = "OFFLINE_SYNC_DB")]
    db: Option<PathBuf>,

    /// Backend base URL, overriding the config.
    #[arg(long, env = "OFFLINE_SYNC_API_BASE")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Print queued records, oldest first.
    List,
    /// Queue a write by hand.
    Enqueue {
        /// Endpoint such as /register.
        endpoint: String,
        /// JSON body.
        data: String,
    },
    /// Run one replay pass against the backend.
    Replay,
    /// Drop one record without sending it.
    Delete {
        /// Record id.
        id: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_json_file(path)?,
        None => SyncConfig::default(),
    };
    if let Some(db) = cli.db {
        config.store_path = db;
    }
    if let Some(api_base) = cli.api_base {
        config.api_base_url = api_base;
    }

    let store = StoreHandle::open(&config.store_path, config.busy_timeout()).await?;

    match cli.command {
        Cmd::List => {
            let records = store.list_by_timestamp().await?;
            println!("{} queued request(s)", records.len());
            for record in records {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.id,
                    record.timestamp_iso(),
                    record.endpoint,
                    record.data
                );
            }
        }
        Cmd::Enqueue { endpoint, data } => {
            let data = serde_json::from_str(&data)?;
            let id = store.add(QueueDraft::new(endpoint, data)).await?;
            println!("{id}");
        }
        Cmd::Replay => {
            let transport = ReqwestTransport::new(config.api_base_url.clone());
            let report = replay_pass(&store, &transport).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Cmd::Delete { id } => {
            let outcome = store.delete_by_id(id).await?;
            println!("{outcome:?}");
        }
    }
    Ok(())
}
