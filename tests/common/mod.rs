//! Shared utilities for integration testing.
//!
//! These tests drive the connection machinery over plain TCP: the
//! driver is generic over the stream, so everything above the TLS
//! handshake is exercised against real sockets.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use gemini_server::middleware::Handler;
use gemini_server::net::connection::{serve_connection, ConnectionInfo};
use gemini_server::net::listener::BoundedListener;

pub const LINGER: Duration = Duration::from_millis(1);

/// Run an accept loop over plain TCP for the given handler. The loop
/// lives until the test's runtime drops it.
pub fn spawn_plain_server(listener: BoundedListener, handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        let local_port = listener.local_addr().port();
        loop {
            let (stream, peer_addr, permit) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => break,
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let info = ConnectionInfo::plain(peer_addr, local_port);
                serve_connection(stream, info, &handler, LINGER).await;
            });
        }
    })
}

/// One full exchange: connect, send `wire`, read until the server
/// closes.
pub async fn exchange(addr: SocketAddr, wire: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(wire).await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    reply
}

/// Request line for a path against a test server.
pub fn request_line(path: &str) -> Vec<u8> {
    format!("gemini://localhost{path}\r\n").into_bytes()
}
