//! TCP listener with a bounded worker pool.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce the worker-pool bound via semaphore permits
//!
//! # Design Decisions
//! - The permit is acquired *before* accepting: when the pool is full,
//!   pending connections wait in the OS backlog rather than spawning
//!   unbounded work (Gemini has no "slow down" signal at connect time,
//!   so work queues instead of being rejected)
//! - The permit is held by the connection task and released on drop,
//!   even if the task panics

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {address:?}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[from] std::io::Error),
}

/// A listener whose accepted connections are bounded by a fixed pool of
/// worker slots.
#[derive(Debug)]
pub struct BoundedListener {
    inner: TcpListener,
    workers: Arc<Semaphore>,
    max_connections: usize,
    local_addr: SocketAddr,
}

impl BoundedListener {
    /// Bind to `address` with a pool of `max_connections` worker slots.
    pub async fn bind(address: &str, max_connections: usize) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.to_string(),
                source,
            })?;

        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: address.to_string(),
            source,
        })?;

        tracing::info!(
            address = %local_addr,
            max_connections,
            "listener bound"
        );

        Ok(Self {
            inner: listener,
            workers: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            local_addr,
        })
    }

    /// Accept one connection, waiting for a worker slot first.
    ///
    /// Cancel-safe: dropping the future mid-wait releases nothing it
    /// still holds.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, WorkerPermit), ListenerError> {
        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .expect("worker semaphore is never closed");

        let (stream, peer_addr) = self.inner.accept().await?;

        tracing::debug!(
            peer = %peer_addr,
            available_workers = self.workers.available_permits(),
            "connection accepted"
        );

        Ok((stream, peer_addr, WorkerPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Currently free worker slots.
    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// One worker-pool slot. Held for the lifetime of a connection task;
/// dropping it (normally or on panic) frees the slot.
#[derive(Debug)]
pub struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
}
