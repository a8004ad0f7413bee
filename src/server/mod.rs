//! Server assembly and accept loop.
//!
//! # Data Flow
//! ```text
//! GeminiServer::bind()
//!     → BoundedListener (worker-pool gate)
//!     → accept loop task
//!         → per-connection task: TLS handshake → serve_connection
//!     → ServerHandle (stoppable)
//!
//! ServerHandle::shutdown()
//!     → stop accepting → drain in-flight within the timeout budget
//!     → abort and count the stragglers if the budget runs out
//! ```
//!
//! # Design Decisions
//! - The root handler is always wrapped in the catch-all stage, so a
//!   route table without it still cannot leak a connection
//! - Accept errors are logged and the loop continues; only a closed
//!   listener socket ends it early
//! - Connection tasks own their worker permit and tracker guard, so
//!   both release even when the task panics

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;

use crate::lifecycle::shutdown::Shutdown;
use crate::middleware::{compose, stages, Handler};
use crate::net::connection::{serve_connection, ConnectionInfo, ConnectionTracker};
use crate::net::listener::{BoundedListener, ListenerError};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:1965";
const DEFAULT_MAX_CONNECTIONS: usize = 50;
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_LINGER: Duration = Duration::from_millis(100);

/// Error type for server construction.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Builder for a Gemini server.
pub struct GeminiServer {
    acceptor: TlsAcceptor,
    root_handler: Handler,
    bind_address: String,
    max_connections: usize,
    drain_timeout: Duration,
    linger: Duration,
}

impl GeminiServer {
    pub fn new(acceptor: TlsAcceptor, root_handler: Handler) -> Self {
        Self {
            acceptor,
            root_handler,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            linger: DEFAULT_LINGER,
        }
    }

    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Worker-pool bound: at most this many connections in flight.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// How long shutdown waits for in-flight connections before
    /// aborting them.
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Pause between half-close and drop after the reply is written.
    pub fn linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Bind the listener and start the accept loop.
    pub async fn bind(self) -> Result<ServerHandle, ServerError> {
        let listener = BoundedListener::bind(&self.bind_address, self.max_connections).await?;
        let local_addr = listener.local_addr();

        // Last-resort catch-all, even if the route table already has one.
        let handler = compose(&[stages::recover()], self.root_handler);

        let shutdown = Shutdown::new();
        let shutdown_rx = shutdown.subscribe();
        let tracker = ConnectionTracker::new();

        tracing::info!(address = %local_addr, "server started");

        let task = tokio::spawn(run_accept_loop(
            listener,
            self.acceptor,
            handler,
            shutdown_rx,
            tracker,
            self.drain_timeout,
            self.linger,
        ));

        Ok(ServerHandle {
            local_addr,
            shutdown,
            task,
        })
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and begin draining. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait for the accept loop and all connection tasks to finish.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "accept loop task failed");
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_accept_loop(
    listener: BoundedListener,
    acceptor: TlsAcceptor,
    handler: Handler,
    mut shutdown_rx: broadcast::Receiver<()>,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
    linger: Duration,
) {
    let local_port = listener.local_addr().port();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!(
                    in_flight = tracker.active_count(),
                    "shutdown requested, no longer accepting"
                );
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer_addr, permit) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                let acceptor = acceptor.clone();
                let handler = handler.clone();
                let tracker = tracker.clone();
                tasks.spawn(async move {
                    // Both release on any exit path, panics included.
                    let _permit = permit;
                    let tls_stream = match acceptor.accept(stream).await {
                        Ok(tls_stream) => tls_stream,
                        Err(e) => {
                            tracing::debug!(peer = %peer_addr, error = %e, "TLS handshake failed");
                            return;
                        }
                    };

                    let info = ConnectionInfo::from_tls(
                        peer_addr,
                        local_port,
                        tls_stream.get_ref().1,
                    );
                    let _guard = tracker.track(info.id);
                    serve_connection(tls_stream, info, &handler, linger).await;
                });
            }
            Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = finished {
                    if e.is_panic() {
                        tracing::error!(error = %e, "connection task panicked");
                    }
                }
            }
        }
    }

    drop(listener);
    match drain_connections(tasks, &tracker, drain_timeout).await {
        DrainOutcome::Drained => tracing::info!("all connections drained"),
        DrainOutcome::Aborted { abandoned } => {
            tracing::warn!(abandoned, "drain timeout exceeded, connections aborted");
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum DrainOutcome {
    Drained,
    Aborted { abandoned: usize },
}

/// Wait for in-flight connection tasks within the timeout budget, then
/// abort whatever remains.
async fn drain_connections(
    mut tasks: JoinSet<()>,
    tracker: &ConnectionTracker,
    timeout: Duration,
) -> DrainOutcome {
    tracing::debug!(
        in_flight = tracker.active_count(),
        timeout_ms = timeout.as_millis() as u64,
        "draining connections"
    );

    let drained = tokio::time::timeout(timeout, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    match drained {
        Ok(()) => DrainOutcome::Drained,
        Err(_) => {
            let abandoned = tasks.len();
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
            DrainOutcome::Aborted { abandoned }
        }
    }
}
