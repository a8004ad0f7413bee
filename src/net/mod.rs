//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop gate, worker-pool permits)
//!     → tls.rs (rustls handshake, optional client-cert capture)
//!     → connection.rs (request read → pipeline → reply write → close)
//!
//! Per connection: exactly one reply write and one close, with a brief
//! linger between half-close and full close so the client drains.
//! ```
//!
//! # Design Decisions
//! - Permits are acquired before accepting, so at most N connections
//!   are in flight; excess queues in the OS backlog
//! - TLS handshake failures close without a reply (no channel to write)
//! - The connection driver is generic over the stream so tests can run
//!   it over in-memory duplex pipes

pub mod connection;
pub mod listener;
pub mod tls;
