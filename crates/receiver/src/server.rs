//! The accepting TLS server.
//!
//! Binds a TCP port, performs the mutually-authenticated handshake, and
//! runs one upload session per connection. Authorization happens before
//! any frame is read; every session ends with exactly one reply.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use dropgate_identity::{IdentityGate, TlsPaths, server_config};
use dropgate_protocol::{Reply, write_reply};

use crate::ReceiverError;
use crate::session;
use crate::storage::StorageLayout;

/// Receiver configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// Root of the per-identity storage tree.
    pub storage_root: std::path::PathBuf,
    /// This party's certificate, key, and trust anchor.
    pub tls: TlsPaths,
    /// Common names allowed to upload.
    pub allowed_senders: Vec<String>,
}

/// The receiving agent.
pub struct Receiver {
    layout: StorageLayout,
    gate: IdentityGate,
    acceptor: TlsAcceptor,
    port: u16,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Receiver {
    /// Creates a receiver, loading TLS material and creating the storage
    /// root. Failures here are fatal startup conditions.
    pub fn new(config: ReceiverConfig) -> Result<Arc<Self>, ReceiverError> {
        std::fs::create_dir_all(&config.storage_root)?;
        let tls = server_config(&config.tls)?;

        Ok(Arc::new(Self {
            layout: StorageLayout::new(config.storage_root),
            gate: IdentityGate::new(config.allowed_senders),
            acceptor: TlsAcceptor::from(Arc::new(tls)),
            port: config.port,
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        }))
    }

    /// Returns the bound address, available once [`run`](Self::run) has
    /// bound the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Requests a graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the accept loop until cancellation, then drains in-flight
    /// sessions (no forced mid-transfer abort).
    pub async fn run(self: &Arc<Self>) -> Result<(), ReceiverError> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let listener = TcpListener::bind(addr).await?;

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        info!("receiver listening on {local_addr}");

        let mut sessions = JoinSet::new();
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("receiver shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let receiver = Arc::clone(self);
                            sessions.spawn(async move {
                                if let Err(e) = receiver.handle_connection(stream, peer_addr).await {
                                    debug!(%peer_addr, "connection ended with error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            error!("accept error: {e}");
                        }
                    }
                }

                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            }
        }

        drop(listener);
        while sessions.join_next().await.is_some() {}
        info!("receiver stopped");
        Ok(())
    }

    /// Handles one connection: handshake, authorize, run the session,
    /// write the reply.
    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), ReceiverError> {
        let mut tls = self.acceptor.accept(stream).await?;

        let authorized = {
            let (_, conn) = tls.get_ref();
            self.gate.authorize(conn.peer_certificates())
        };

        let reply = match authorized {
            Ok(identity) => {
                debug!(identity, %peer_addr, "session authorized");
                session::receive_file(&mut tls, &identity, &self.layout).await
            }
            // Rejected before a single frame is read.
            Err(e) => Reply::unauthenticated(e.to_string()),
        };

        if !reply.is_ok() {
            warn!(%peer_addr, code = %reply.code, message = %reply.message, "session failed");
        }

        write_reply(&mut tls, &reply).await?;
        let _ = tls.shutdown().await;
        Ok(())
    }
}
