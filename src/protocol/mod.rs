//! Gemini wire protocol subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming connection (post TLS handshake)
//!     → request.rs (read one CRLF-terminated request line, ≤1024 bytes)
//!     → Parsed Request (uri, path segments, connection metadata)
//!     → handler pipeline
//!     → response.rs (status + meta + optional body)
//!     → serialized as "<status> <meta>\r\n" [body] and the socket closes
//! ```
//!
//! # Design Decisions
//! - One request and one response per connection, no keep-alive
//! - Request line capped before parsing (early rejection, status 59)
//! - Response constructors are pure and total; the status/meta pairing
//!   follows the fixed Gemini taxonomy
//! - The parser never writes to the socket; replies flow through the
//!   connection writer regardless of which stage produced them

pub mod request;
pub mod response;

pub use request::{Request, RequestError, MAX_REQUEST_LINE};
pub use response::{Response, Status};
