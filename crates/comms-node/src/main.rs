//! # comms-node
//!
//! Relay node binary: serve the relay, dial a relay from the terminal, or
//! query a node's health.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::BufReader;

use comms_node::NodeServer;
use comms_node::health::HealthResponse;
use comms_settings::CommsSettings;
use comms_socket::{Bootstrap, ShutdownCoordinator, SocketPolicy};

/// Relay node for typed WebSocket sessions.
#[derive(Parser, Debug)]
#[command(name = "comms-node", about = "Relay node for typed WebSocket sessions")]
struct Cli {
    /// Settings file (defaults to `~/.comms/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay node.
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, 0 for auto-assign (overrides settings).
        #[arg(long)]
        port: Option<u16>,
        /// Maximum concurrent sessions (overrides settings).
        #[arg(long)]
        max_connections: Option<usize>,
    },
    /// Dial a WebSocket URL and pipe JSON lines between it and stdin/stdout.
    Dial {
        /// `ws://` or `wss://` URL.
        url: String,
    },
    /// Print the `/health` response of a running node.
    Status {
        /// Base HTTP URL of the node, e.g. `http://127.0.0.1:7890`.
        url: String,
    },
}

fn load(cli: &Cli) -> Result<CommsSettings> {
    match &cli.config {
        Some(path) => comms_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => comms_settings::load_settings().context("Failed to load settings"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load(&cli)?;
    comms_core::logging::init(&settings.logging.level, settings.logging.format);

    let shutdown = ShutdownCoordinator::new();
    let _signal = shutdown.install_interrupt_handler();

    match cli.command {
        Command::Serve {
            host,
            port,
            max_connections,
        } => {
            if let Some(host) = host {
                settings.node.host = host;
            }
            if let Some(port) = port {
                settings.node.port = port;
            }
            if let Some(max) = max_connections {
                settings.node.max_connections = max;
            }
            serve(&settings, shutdown).await
        }
        Command::Dial { url } => dial(&settings, &url, shutdown).await,
        Command::Status { url } => status(&url).await,
    }
}

async fn serve(settings: &CommsSettings, shutdown: ShutdownCoordinator) -> Result<()> {
    let metrics = comms_node::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let node = NodeServer::new(settings, shutdown, Some(metrics))
        .listen()
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                settings.node.host, settings.node.port
            )
        })?;
    tracing::info!(addr = %node.addr(), "ready");

    let grace = SocketPolicy::from_settings(&settings.socket).interrupt_grace;
    node.wait(grace).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn dial(settings: &CommsSettings, url: &str, shutdown: ShutdownCoordinator) -> Result<()> {
    let bootstrap =
        Bootstrap::new(SocketPolicy::from_settings(&settings.socket)).with_interrupt(shutdown.token());
    let session = bootstrap
        .dial::<Value, Value>(url)
        .await
        .with_context(|| format!("Failed to dial {url}"))?;

    let reason = comms_node::bridge::run(
        &session,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;
    tracing::info!(%reason, "session closed");
    Ok(())
}

async fn status(url: &str) -> Result<()> {
    let endpoint = format!("{}/health", url.trim_end_matches('/'));
    let health: HealthResponse = comms_http::get_json(&endpoint)
        .await
        .with_context(|| format!("Failed to query {endpoint}"))?;
    println!("{}", serde_json::to_string_pretty(&health)?);
    Ok(())
}
