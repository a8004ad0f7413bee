//! Per-connection driver and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track the live-connection count for graceful shutdown
//! - Drive one connection: read request, run the pipeline, write the
//!   reply, close
//!
//! # Design Decisions
//! - Exactly one reply is written per connection, no matter how the
//!   request or handler fails; after it the write side is shut down
//!   and the stream lingers briefly so the client drains the bytes
//! - The driver is generic over the stream so tests can run it over
//!   in-memory duplex pipes instead of real TLS sessions

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::middleware::Handler;
use crate::protocol::{Request, RequestError, Response};

/// Global atomic counter for connection IDs. Relaxed ordering is
/// sufficient since only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Facts about the transport a request arrived on, attached to every
/// [`Request`] so handlers and middleware can log or gate on them.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    pub local_port: u16,
    /// Negotiated TLS protocol version, when known.
    pub protocol: Option<String>,
    /// Negotiated cipher suite, when known.
    pub cipher: Option<String>,
    /// Whether the client presented a certificate during the handshake.
    pub peer_cert_present: bool,
}

impl ConnectionInfo {
    /// Info for a plaintext stream (tests, health probes).
    pub fn plain(peer_addr: SocketAddr, local_port: u16) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            local_port,
            protocol: None,
            cipher: None,
            peer_cert_present: false,
        }
    }

    /// Capture negotiated session facts from a completed handshake.
    pub(crate) fn from_tls(
        peer_addr: SocketAddr,
        local_port: u16,
        session: &rustls::ServerConnection,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            local_port,
            protocol: session.protocol_version().map(|v| format!("{v:?}")),
            cipher: session
                .negotiated_cipher_suite()
                .map(|s| format!("{:?}", s.suite())),
            peer_cert_present: session.peer_certificates().is_some(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::plain("127.0.0.1:49152".parse().unwrap(), 1965)
    }
}

/// Tracks the live-connection count for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live connection. The returned guard decrements the
    /// count on drop, including on panic.
    pub fn track(&self, id: ConnectionId) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard for one tracked connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection = %self.id, "connection closed");
    }
}

/// Drive one connection to completion.
///
/// Reads the single request line, runs it through `handler`, writes the
/// single reply, then half-closes and lingers for `linger` so the
/// client can drain before the stream drops.
pub async fn serve_connection<S>(
    stream: S,
    info: ConnectionInfo,
    handler: &Handler,
    linger: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);

    let response = match Request::read(&mut stream, info.clone()).await {
        Ok(request) => dispatch(handler, request, &info).await,
        Err(RequestError::Closed) => {
            tracing::debug!(connection = %info.id, "peer closed before sending a request");
            return;
        }
        Err(RequestError::Io(e)) => {
            tracing::debug!(connection = %info.id, error = %e, "request read failed");
            return;
        }
        Err(e @ RequestError::NoPath) => {
            tracing::error!(connection = %info.id, error = %e, "request uri not routable");
            Response::unknown_server_error()
        }
        Err(e) => {
            tracing::debug!(connection = %info.id, error = %e, "malformed request");
            Response::bad_request("bad request")
        }
    };

    write_reply(&mut stream, response, &info, linger).await;
}

/// Run the pipeline, converting errors and panics into a generic 40.
///
/// The catch-all middleware stage normally absorbs both; this is the
/// last line in case the handler was built without it.
async fn dispatch(handler: &Handler, request: Request, info: &ConnectionInfo) -> Response {
    match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(connection = %info.id, error = %e, "handler failed");
            Response::unknown_server_error()
        }
        Err(_) => {
            tracing::error!(connection = %info.id, "handler panicked");
            Response::unknown_server_error()
        }
    }
}

async fn write_reply<S>(
    stream: &mut S,
    response: Response,
    info: &ConnectionInfo,
    linger: Duration,
) where
    S: AsyncWrite + Unpin,
{
    let bytes = response.into_bytes();
    if let Err(e) = stream.write_all(&bytes).await {
        tracing::debug!(connection = %info.id, error = %e, "reply write failed");
        return;
    }
    if let Err(e) = stream.flush().await {
        tracing::debug!(connection = %info.id, error = %e, "reply flush failed");
        return;
    }
    // Half-close first so the client sees EOF after the body, then hold
    // the stream open briefly; closing a TLS stream immediately after
    // the last write can discard buffered bytes on some client stacks.
    if let Err(e) = stream.shutdown().await {
        tracing::trace!(connection = %info.id, error = %e, "shutdown after reply failed");
    }
    tokio::time::sleep(linger).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::HandlerError;
    use tokio::io::AsyncReadExt;

    const LINGER: Duration = Duration::from_millis(1);

    fn echo_handler() -> Handler {
        Handler::new(|req: Request| async move {
            Ok(Response::success("text/plain", req.path().as_bytes().to_vec()))
        })
    }

    async fn exchange(handler: &Handler, wire: &[u8]) -> Vec<u8> {
        let (mut client, server) = tokio::io::duplex(4096);
        let wire = wire.to_vec();
        let write = async {
            client.write_all(&wire).await.unwrap();
            client.shutdown().await.unwrap();
            let mut out = Vec::new();
            client.read_to_end(&mut out).await.unwrap();
            out
        };
        let serve = serve_connection(server, ConnectionInfo::for_tests(), handler, LINGER);
        let (out, ()) = tokio::join!(write, serve);
        out
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn tracker_counts_guards() {
        let tracker = ConnectionTracker::new();
        let g1 = tracker.track(ConnectionId::new());
        let g2 = tracker.track(ConnectionId::new());
        assert_eq!(tracker.active_count(), 2);
        drop(g1);
        assert_eq!(tracker.active_count(), 1);
        drop(g2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn replies_once_and_closes() {
        let out = exchange(&echo_handler(), b"gemini://localhost/hello\r\n").await;
        assert_eq!(out, b"20 text/plain\r\n/hello");
    }

    #[tokio::test]
    async fn malformed_request_gets_59() {
        let out = exchange(&echo_handler(), b"gemini://localhost/hello\n").await;
        assert!(out.starts_with(b"59 "), "got {:?}", String::from_utf8_lossy(&out));
    }

    #[tokio::test]
    async fn oversized_request_gets_59() {
        let mut wire = b"gemini://localhost/".to_vec();
        wire.extend(std::iter::repeat(b'a').take(2000));
        wire.extend_from_slice(b"\r\n");
        let out = exchange(&echo_handler(), &wire).await;
        assert!(out.starts_with(b"59 "));
    }

    #[tokio::test]
    async fn empty_connection_writes_nothing() {
        let out = exchange(&echo_handler(), b"").await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn panicking_handler_still_replies_40() {
        let handler = Handler::new(|_req: Request| async move {
            panic!("boom");
            #[allow(unreachable_code)]
            Err::<Response, HandlerError>("unreachable".into())
        });
        let out = exchange(&handler, b"gemini://localhost/\r\n").await;
        assert!(out.starts_with(b"40 "));
    }
}
