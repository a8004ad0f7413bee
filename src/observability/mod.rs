//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via the tracing crate; every connection and
//!   request log line carries the connection id
//! - No metrics endpoint; log lines are the operational surface

pub mod logging;
