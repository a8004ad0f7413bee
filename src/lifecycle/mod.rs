//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     Shutdown::trigger() → broadcast to accept loop
//!     → stop accepting → drain connections → exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - Draining has a timeout: stragglers are aborted after the deadline

pub mod shutdown;
pub mod signals;
