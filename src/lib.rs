//! Gemini Protocol Server Library
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                GEMINI SERVER                  │
//!                        │                                               │
//!     TLS connection     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ───────────────────┼─▶│   net   │──▶│ protocol │──▶│  routing  │  │
//!                        │  │listener │   │ request  │   │   tree    │  │
//!                        │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                        │                                     │        │
//!                        │                                     ▼        │
//!                        │                              ┌───────────┐   │
//!                        │                              │middleware │   │
//!                        │                              │ pipeline  │   │
//!                        │                              └─────┬─────┘   │
//!                        │                                    │         │
//!     one reply, close   │  ┌─────────┐   ┌──────────┐  ┌─────▼─────┐   │
//!     ◀──────────────────┼──│   net   │◀──│ protocol │◀─│ handlers  │   │
//!                        │  │ writer  │   │ response │  │ (+ files) │   │
//!                        │  └─────────┘   └──────────┘  └───────────┘   │
//!                        │                                               │
//!                        │  ┌─────────────────────────────────────────┐  │
//!                        │  │          Cross-Cutting Concerns          │  │
//!                        │  │  config · lifecycle · observability      │  │
//!                        │  └─────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod middleware;
pub mod net;
pub mod protocol;
pub mod routing;
pub mod server;

// Content
pub mod files;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use files::serve_files;
pub use middleware::{Handler, HandlerError, Middleware};
pub use protocol::{Request, Response, Status};
pub use routing::{build_routes, Route};
pub use server::{GeminiServer, ServerHandle};
