//! HTTPS server implementation

use crate::handler;
use crate::shutdown::ShutdownSignal;
use crate::RuntimeState;
use axum::Router;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use mocknifi_core::{Error, Result};
use mocknifi_tls::TlsAcceptor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

/// Default listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

/// Default time to wait for in-flight connections on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTPS server
pub struct Server {
    listen: SocketAddr,
    tls: TlsAcceptor,
    router: Router,
    state: Arc<RwLock<RuntimeState>>,
    shutdown: ShutdownSignal,
    shutdown_timeout: Duration,
    active_connections: Arc<AtomicUsize>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listen", &self.listen)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("active_connections", &self.active_connections)
            .finish()
    }
}

impl Server {
    /// Create a new server builder
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Get the current state
    pub async fn state(&self) -> RuntimeState {
        *self.state.read().await
    }

    /// Get listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Bind the listen address and run until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.listen)
            .await
            .map_err(|e| Error::Runtime(format!("Failed to bind to {}: {}", self.listen, e)))?;

        self.run_with_listener(listener).await
    }

    /// Serve connections from an already bound listener until shutdown
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();

        self.set_state(RuntimeState::Running).await;

        let local = listener.local_addr()?;
        tracing::info!(listen = %local, "HTTPS server listening, client certificates required");

        while !self.shutdown.is_triggered() {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.spawn_connection(stream, peer),
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(listener);
        self.set_state(RuntimeState::ShuttingDown).await;
        self.drain().await;
        self.set_state(RuntimeState::Stopped).await;

        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        tracing::trace!("Accepted connection from {}", peer);

        let tls = self.tls.clone();
        let service = TowerToHyperService::new(self.router.clone());
        let guard = ConnectionGuard::new(Arc::clone(&self.active_connections));
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let _guard = guard;

            let tls_stream = tokio::select! {
                result = tls.accept(stream) => match result {
                    Ok(tls_stream) => tls_stream,
                    Err(e) => {
                        tracing::warn!(peer = %peer, error = %e, "Rejected connection");
                        return;
                    }
                },
                _ = shutdown_rx.recv() => return,
            };

            let io = TokioIo::new(tls_stream);
            let conn = hyper::server::conn::http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown_rx.recv() => {
                    // finish the in-flight request, then close instead of idling
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };

            if let Err(e) = result {
                tracing::debug!(peer = %peer, error = %e, "HTTPS connection error");
            }
        });
    }

    async fn drain(&self) {
        let start = std::time::Instant::now();

        tracing::info!(
            timeout_secs = self.shutdown_timeout.as_secs(),
            "Waiting for in-flight connections to complete"
        );

        loop {
            let active = self.active_connections();

            if active == 0 {
                tracing::info!("All connections completed, shutting down cleanly");
                break;
            }

            if start.elapsed() >= self.shutdown_timeout {
                tracing::warn!(
                    active_connections = active,
                    "Shutdown timeout reached, forcing shutdown"
                );
                break;
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tracing::info!(
            shutdown_duration_ms = start.elapsed().as_millis(),
            "Server stopped"
        );
    }

    async fn set_state(&self, state: RuntimeState) {
        *self.state.write().await = state;
    }
}

/// Keeps the active connection count accurate however the task ends
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Server builder
#[derive(Debug)]
pub struct ServerBuilder {
    listen: Option<SocketAddr>,
    tls: Option<TlsAcceptor>,
    shutdown_timeout: Duration,
    shutdown: Option<ShutdownSignal>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            listen: None,
            tls: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            shutdown: None,
        }
    }

    /// Set listen address
    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.listen = Some(addr);
        self
    }

    /// Set the TLS acceptor
    pub fn tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    /// Set shutdown timeout
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Share an existing shutdown signal
    pub fn shutdown_signal(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Build the server
    pub fn build(self) -> Result<Server> {
        let tls = self
            .tls
            .ok_or_else(|| Error::Config("TLS acceptor is required".to_string()))?;

        let listen = match self.listen {
            Some(addr) => addr,
            None => DEFAULT_LISTEN_ADDR
                .parse()
                .map_err(|e| Error::Config(format!("Invalid listen address: {}", e)))?,
        };

        Ok(Server {
            listen,
            tls,
            router: handler::router(),
            state: Arc::new(RwLock::new(RuntimeState::Initializing)),
            shutdown: self.shutdown.unwrap_or_default(),
            shutdown_timeout: self.shutdown_timeout,
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
