//! # Letterbox shell
//!
//! Reads forum commands from stdin and runs them against an in-memory
//! replica. Settings come from `letterbox.toml`, `.env` and `LETTERBOX__*`.

mod commands;

use std::sync::Arc;

use configs::{LogSettings, Settings};
use services::Letterbox;
use storage_adapters::MemoryReplica;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use commands::Command;

fn init_tracing(log: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);
    if let Some(path) = &settings.env_file {
        debug!(path = %path.display(), "loaded .env");
    }

    let identity = settings.keypair();
    match &identity {
        Some(keypair) => info!(author = %keypair.address, "using configured identity"),
        None => warn!("no identity configured; writes will be refused"),
    }

    let replica = Arc::new(MemoryReplica::new());
    let letterbox = Letterbox::with_config(replica, identity, settings.layer_config());
    info!(namespace = %settings.namespace, "letterbox ready; type `help`");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match commands::parse(line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(err) = commands::run(&letterbox, command).await {
                    eprintln!("error: {err:#}");
                }
            }
            Err(err) => eprintln!("{err:#}"),
        }
    }

    Ok(())
}
