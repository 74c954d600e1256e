//! The dropgate receiving agent.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dropgate_cli::config::{self, RecvFileConfig};
use dropgate_identity::TlsPaths;
use dropgate_receiver::{Receiver, ReceiverConfig};

#[derive(Parser)]
#[command(about = "Receive and store files mirrored by dropgate senders")]
struct Cli {
    /// TCP port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Root of the storage tree.
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Sender common name to allow (repeatable).
    #[arg(long)]
    allow: Vec<String>,

    /// Path to this receiver's certificate.
    #[arg(long)]
    crt: Option<PathBuf>,

    /// Path to this receiver's private key.
    #[arg(long)]
    key: Option<PathBuf>,

    /// Path to the certificate authority certificate.
    #[arg(long)]
    ca: Option<PathBuf>,

    /// Optional TOML config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let file: RecvFileConfig = config::load(cli.config.as_deref())?;

    let allowed_senders = if cli.allow.is_empty() {
        file.allow.unwrap_or_default()
    } else {
        cli.allow
    };
    if allowed_senders.is_empty() {
        tracing::warn!("allow-list is empty; every sender will be rejected");
    }

    let config = ReceiverConfig {
        port: cli.port.or(file.port).unwrap_or(4443),
        storage_root: cli
            .storage
            .or(file.storage)
            .unwrap_or_else(|| PathBuf::from("storage")),
        tls: TlsPaths {
            certificate: cli.crt.or(file.certificate).context("--crt is required")?,
            key: cli.key.or(file.key).context("--key is required")?,
            cert_authority: cli.ca.or(file.cert_authority).context("--ca is required")?,
        },
        allowed_senders,
    };

    let receiver = Receiver::new(config)?;
    let runner = Arc::clone(&receiver);
    let handle = tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    receiver.shutdown();

    handle.await??;
    Ok(())
}
