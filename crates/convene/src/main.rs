//! # convene
//!
//! Server binary and group administration CLI. Loads settings, opens the
//! stores and either serves joins or edits group records.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use convene_core::logging::init_subscriber;
use convene_core::{GroupId, GroupRecord, UserId};
use convene_server::ConveneServer;
use convene_settings::ConveneSettings;
use convene_store::{ConnectionConfig, GroupStore, SqliteGroupStore};

/// Group membership and join broadcast server.
#[derive(Parser, Debug)]
#[command(name = "convene", about = "Group membership and join broadcast server")]
struct Cli {
    /// Settings file (default: `~/.convene/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP + WebSocket server.
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides settings, 0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect or edit group records.
    #[command(subcommand)]
    Group(GroupCommand),
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    /// Create a group or replace its member list.
    Create {
        /// Group id.
        id: String,

        /// A user allowed to join (repeatable).
        #[arg(long = "member", required = true)]
        members: Vec<String>,
    },

    /// Print a group record as JSON.
    Show {
        /// Group id.
        id: String,
    },
}

fn load_settings(path: Option<&Path>) -> Result<ConveneSettings> {
    match path {
        Some(path) => convene_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => convene_settings::load_settings().context("Failed to load settings"),
    }
}

fn open_groups(settings: &ConveneSettings) -> Result<SqliteGroupStore> {
    let path = &settings.store.groups_path;
    if path != ":memory:" {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let config = ConnectionConfig {
        pool_size: settings.store.pool_size,
        busy_timeout_ms: settings.store.busy_timeout_ms,
    };
    SqliteGroupStore::open(path, &config)
        .with_context(|| format!("Failed to open group store at {path}"))
}

async fn create_group(store: &SqliteGroupStore, id: &str, members: &[String]) -> Result<GroupRecord> {
    let group_id = GroupId::from(id);
    let record = GroupRecord::new(group_id.clone(), members.iter().map(|m| UserId::from(m.as_str())));
    store.upsert(record).await.context("Failed to save group")?;
    store
        .get(&group_id)
        .await
        .context("Failed to read group back")?
        .context("Group vanished after save")
}

async fn show_group(store: &SqliteGroupStore, id: &str) -> Result<String> {
    let Some(record) = store.get(&GroupId::from(id)).await.context("Failed to read group")? else {
        bail!("group {id} not found");
    };
    serde_json::to_string_pretty(&record).context("Failed to serialize group")
}

async fn serve(mut settings: ConveneSettings, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    let metrics_handle = convene_server::metrics::install_recorder();
    let server = ConveneServer::from_settings(&settings)
        .await
        .context("Failed to initialize server")?
        .with_metrics(metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to bind listener")?;
    tracing::info!(%addr, mode = ?settings.delivery.mode, "convene ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let drained = server.shutdown().graceful_shutdown(vec![handle]).await;
    if !drained {
        tracing::warn!("forced shutdown after drain timeout");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_subscriber(&settings.logging.level, settings.logging.format);

    match cli.command {
        Command::Serve { host, port } => serve(settings, host, port).await,
        Command::Group(GroupCommand::Create { id, members }) => {
            let store = open_groups(&settings)?;
            let record = create_group(&store, &id, &members).await?;
            println!("group {id} saved with {} member(s)", record.members.len());
            Ok(())
        }
        Command::Group(GroupCommand::Show { id }) => {
            let store = open_groups(&settings)?;
            println!("{}", show_group(&store, &id).await?);
            Ok(())
        }
    }
}
