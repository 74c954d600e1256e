//! The dropgate sending agent.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dropgate_cli::config::{self, SendFileConfig};
use dropgate_identity::TlsPaths;
use dropgate_sender::{Sender, SenderConfig};

#[derive(Parser)]
#[command(about = "Mirror a local folder to a dropgate receiver")]
struct Cli {
    /// Folder to monitor and mirror.
    folder: Option<PathBuf>,

    /// Receiver address as host:port.
    #[arg(long)]
    host: Option<String>,

    /// Folder poll interval in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Maximum number of concurrently uploaded files.
    #[arg(long)]
    parallel: Option<usize>,

    /// Chunk size in bytes.
    #[arg(long)]
    chunk: Option<usize>,

    /// Path to this sender's certificate.
    #[arg(long)]
    crt: Option<PathBuf>,

    /// Path to this sender's private key.
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
    let file: SendFileConfig = config::load(cli.config.as_deref())?;

    let config = SenderConfig {
        host: cli
            .host
            .or(file.host)
            .unwrap_or_else(|| "localhost:4443".into()),
        monitor_folder: cli
            .folder
            .or(file.folder)
            .context("a folder to monitor is required")?,
        poll_interval: Duration::from_secs(cli.interval.or(file.interval_secs).unwrap_or(5)),
        tls: TlsPaths {
            certificate: cli.crt.or(file.certificate).context("--crt is required")?,
            key: cli.key.or(file.key).context("--key is required")?,
            cert_authority: cli.ca.or(file.cert_authority).context("--ca is required")?,
        },
        parallel_uploads: cli.parallel.or(file.parallel).unwrap_or(30),
        chunk_size: cli.chunk.or(file.chunk_size).unwrap_or(0),
    };

    let sender = Sender::new(config)?;
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            signal_cancel.cancel();
        }
    });

    sender.run(cancel).await?;
    Ok(())
}
