//! Watch/dispatch pipeline.
//!
//! One monitor task is the sole owner of the in-flight tracking set; it
//! multiplexes the scan timer and both result channels in a single
//! `select!` loop, so tracking state is never touched concurrently.
//! Workers communicate outcomes only through the committed/failed
//! channels, never by mutating shared state.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use dropgate_identity::{TlsPaths, client_config};

use crate::SenderError;
use crate::scanner;
use crate::session;

/// Capacity of the dispatch queue between the scanner and the workers.
const DISPATCH_QUEUE_CAPACITY: usize = 100;

/// Capacity of each result channel back to the monitor.
const RESULT_QUEUE_CAPACITY: usize = 100;

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Receiver address as `host:port`; the host part is also the TLS
    /// server name.
    pub host: String,
    /// Folder to mirror.
    pub monitor_folder: PathBuf,
    /// Scan interval (the first scan fires immediately).
    pub poll_interval: Duration,
    /// This party's certificate, key, and trust anchor.
    pub tls: TlsPaths,
    /// Number of concurrent upload workers.
    pub parallel_uploads: usize,
    /// Chunk size in bytes (0 = default).
    pub chunk_size: usize,
}

/// The sending agent.
pub struct Sender {
    config: SenderConfig,
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

impl Sender {
    /// Creates a sender, validating the monitored folder and loading TLS
    /// material. Failures here are fatal startup conditions.
    pub fn new(config: SenderConfig) -> Result<Self, SenderError> {
        if !config.monitor_folder.is_dir() {
            return Err(SenderError::MonitorFolder(config.monitor_folder.clone()));
        }

        let tls = client_config(&config.tls)?;
        let host = config
            .host
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&config.host);
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| SenderError::BadHost(config.host.clone()))?;

        Ok(Self {
            config,
            connector: TlsConnector::from(Arc::new(tls)),
            server_name,
        })
    }

    /// Runs the pipeline until cancellation, then waits for the monitor
    /// and every worker to exit.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SenderError> {
        info!(
            folder = %self.config.monitor_folder.display(),
            host = %self.config.host,
            "sender started"
        );

        let (dispatch_tx, dispatch_rx) = mpsc::channel::<PathBuf>(DISPATCH_QUEUE_CAPACITY);
        let (committed_tx, committed_rx) = mpsc::channel::<PathBuf>(RESULT_QUEUE_CAPACITY);
        let (failed_tx, failed_rx) = mpsc::channel::<PathBuf>(RESULT_QUEUE_CAPACITY);

        let dispatch_rx = Arc::new(Mutex::new(dispatch_rx));
        let mut workers = JoinSet::new();
        for worker in 0..self.config.parallel_uploads.max(1) {
            workers.spawn(worker_loop(
                worker,
                self.connector.clone(),
                self.config.host.clone(),
                self.server_name.clone(),
                self.config.monitor_folder.clone(),
                self.config.chunk_size,
                Arc::clone(&dispatch_rx),
                committed_tx.clone(),
                failed_tx.clone(),
                cancel.clone(),
            ));
        }
        drop(committed_tx);
        drop(failed_tx);

        self.monitor(&cancel, dispatch_tx, committed_rx, failed_rx)
            .await;

        // Workers finish their in-flight session, then exit.
        while workers.join_next().await.is_some() {}
        info!("sender stopped");
        Ok(())
    }

    /// The single logical owner of the tracking set.
    async fn monitor(
        &self,
        cancel: &CancellationToken,
        dispatch_tx: mpsc::Sender<PathBuf>,
        mut committed_rx: mpsc::Receiver<PathBuf>,
        mut failed_rx: mpsc::Receiver<PathBuf>,
    ) {
        let mut in_flight: HashSet<PathBuf> = HashSet::new();
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                Some(path) = committed_rx.recv() => {
                    // The remote copy is durable; a failed local delete
                    // only means redundant re-upload work next scan.
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        error!(path = %path.display(), "failed to delete uploaded file: {e}");
                    }
                    in_flight.remove(&path);
                }

                Some(path) = failed_rx.recv() => {
                    // Eligible again on the very next scan, no backoff.
                    in_flight.remove(&path);
                }

                _ = ticker.tick() => {
                    self.scan_into(&mut in_flight, &dispatch_tx);
                }
            }
        }
    }

    /// One scan cycle: discover files and hand untracked ones to the
    /// dispatch queue without ever blocking on it.
    fn scan_into(&self, in_flight: &mut HashSet<PathBuf>, dispatch_tx: &mpsc::Sender<PathBuf>) {
        let files = match scanner::scan_folder(&self.config.monitor_folder) {
            Ok(files) => files,
            Err(e) => {
                error!("failed to scan monitored folder: {e}");
                return;
            }
        };

        for path in files {
            if in_flight.contains(&path) {
                continue;
            }
            match dispatch_tx.try_send(path.clone()) {
                Ok(()) => {
                    in_flight.insert(path);
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Stays untracked; the next scan retries it.
                    warn!(path = %path.display(), "dispatch queue full, deferring to next scan");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
    }
}

/// One upload worker: pulls a path, runs one session to completion, and
/// reports the outcome.
#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker: usize,
    connector: TlsConnector,
    addr: String,
    server_name: ServerName<'static>,
    root: PathBuf,
    chunk_size: usize,
    queue: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    committed_tx: mpsc::Sender<PathBuf>,
    failed_tx: mpsc::Sender<PathBuf>,
    cancel: CancellationToken,
) {
    loop {
        let path = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            path = recv_next(&queue) => match path {
                Some(path) => path,
                None => break,
            },
        };

        let Some(name) = scanner::relative_name(&root, &path) else {
            warn!(worker, path = %path.display(), "path escapes the monitored root");
            let _ = failed_tx.send(path).await;
            continue;
        };

        debug!(worker, file = %name, "uploading");
        match session::upload_file(
            &connector,
            &addr,
            server_name.clone(),
            &path,
            &name,
            chunk_size,
        )
        .await
        {
            Ok(()) => {
                debug!(worker, file = %name, "uploaded");
                if committed_tx.send(path).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!(worker, file = %name, "upload failed: {e}");
                if failed_tx.send(path).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn recv_next(queue: &Arc<Mutex<mpsc::Receiver<PathBuf>>>) -> Option<PathBuf> {
    queue.lock().await.recv().await
}
