//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route compilation (at startup):
//!     Vec<Route> (declarative table, possibly nested)
//!     → table.rs: expand multi-segment paths, validate entries
//!     → pre-compose per-node middleware into stored handlers
//!     → Freeze as an immutable RouteNode tree
//!
//! Per request:
//!     tree.rs: consume remaining segments, literal child first,
//!     then capture child (binding params), else node fallback,
//!     else status 51
//! ```
//!
//! # Design Decisions
//! - Tree built once, immutable at runtime (shared without locks)
//! - Literal matches win over a capture at the same node
//! - Captured parameters merge additively across nested levels
//! - Middleware is composed at build time, not interpreted per request
//! - A leaf with neither handler nor children fails the build

pub mod table;
pub mod tree;

pub use table::{build_routes, Route, RouteBuildError};
pub use tree::RouteNode;
