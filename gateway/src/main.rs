use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parley_core::GatewayConfig;
use parley_server::{serve, AppState};

#[derive(Parser, Debug)]
#[command(name = "parley-gateway")]
#[command(about = "Chat gateway between a browser widget and an OpenAI-style upstream")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Serve {
        #[arg(long, alias = "host", default_value = "127.0.0.1")]
        hostname: String,
        #[arg(long, default_value_t = 8787)]
        port: u16,
        /// Optional JSON config file; environment variables win over it.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        assistant_id: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            hostname,
            port,
            config,
            api_key,
            assistant_id,
            model,
        } => {
            let mut config = GatewayConfig::load(config.as_deref())?;
            if let Some(key) = api_key {
                config.api_key = Some(key);
            }
            if let Some(id) = assistant_id {
                config.assistant_id = id;
            }
            if let Some(model) = model {
                config.fallback.model = model;
            }
            if config.api_key.is_none() {
                warn!("no upstream API key configured; chat actions will answer 500 until one is set");
            }

            let addr: SocketAddr = format!("{hostname}:{port}")
                .parse()
                .context("invalid hostname or port")?;
            let state = AppState::new(config);
            info!(%addr, "parley gateway listening");
            serve(addr, state).await
        }
    }
}
