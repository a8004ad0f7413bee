//! Middleware pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Composition (at route-build time):
//!     [M1, M2, .. Mn] + terminal handler H
//!     → compose() folds right: M1(M2(..Mn(H)))
//!     → one pre-composed Handler stored in the routing tree
//!
//! Per request:
//!     Request → M1 → M2 → .. → H → .. → M2 → M1 → Response
//! ```
//!
//! # Design Decisions
//! - A middleware stage is a function from handler to handler; the
//!   first-declared stage is outermost (sees the raw request first and
//!   the final response last)
//! - Zero stages compose to the identity wrapper
//! - A stage may short-circuit with an error response without invoking
//!   the inner handler
//! - Every pipeline run by the server carries a catch-all stage
//!   (`stages::recover`) so each connection yields a wire response even
//!   on unexpected failure

pub mod stages;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::{Request, Response};

/// Error type surfaced by handlers. Anything reaching the catch-all
/// stage is logged and converted to status 40; the text never goes on
/// the wire.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

/// Boxed future returned by handlers.
pub type BoxHandlerFuture = Pin<Box<dyn Future<Output = Result<Response, HandlerError>> + Send>>;

/// An application handler: `Request → Response`.
///
/// Cheaply cloneable; the routing tree shares pre-composed handlers
/// across all connection tasks without locking.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(Request) -> BoxHandlerFuture + Send + Sync>);

impl Handler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
    {
        Self(Arc::new(move |req| Box::pin(f(req))))
    }

    pub fn call(&self, req: Request) -> BoxHandlerFuture {
        (self.0)(req)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Handler")
    }
}

/// A middleware stage: wraps a handler, yielding a new handler.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Handler) -> Handler + Send + Sync>);

impl Middleware {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn wrap(&self, inner: Handler) -> Handler {
        (self.0)(inner)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Middleware")
    }
}

/// Compose stages around a terminal handler.
///
/// The first stage in the slice ends up outermost. An empty slice
/// returns the terminal handler unchanged.
pub fn compose(stages: &[Middleware], terminal: Handler) -> Handler {
    stages
        .iter()
        .rev()
        .fold(terminal, |inner, stage| stage.wrap(inner))
}
