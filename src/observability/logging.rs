//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Respect `RUST_LOG` when set, falling back to the configured level
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Before init (and in tests that skip it) tracing macros are no-ops,
//!   so library code can log unconditionally

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `default_level` applies to this
/// crate's spans when `RUST_LOG` is not set.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gemini_server={default_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
