//! Bridge binary: parse flags, initialize logging, serve until Ctrl+C.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use vtt_bridge::{run, Bridge, BridgeConfig};

#[derive(Debug, Parser)]
#[command(name = "vtt-bridge", version, about = "Bridge a browser VTT game client to local tooling")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9310")]
    bind: SocketAddr,

    /// Shared secret the game client must present; omit to admit any client
    #[arg(long)]
    token: Option<String>,

    /// Directory receiving media capture files
    #[arg(long, default_value = "captures")]
    capture_dir: PathBuf,

    /// Root directory for image asset listing; omit to disable
    #[arg(long)]
    asset_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vtt_bridge=info".into()),
        )
        .init();

    let args = Args::parse();

    std::fs::create_dir_all(&args.capture_dir)
        .with_context(|| format!("creating capture directory {}", args.capture_dir.display()))?;

    let mut config = BridgeConfig::default()
        .bind(args.bind)
        .capture_dir(args.capture_dir);
    if let Some(token) = args.token {
        config = config.auth_token(token);
    }
    if let Some(root) = args.asset_root {
        config = config.asset_root(root);
    }

    let bridge = Bridge::new(config);
    run(bridge, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("bridge server failed")?;

    Ok(())
}
