//! Static file serving subsystem.
//!
//! # Data Flow
//! ```text
//! Request remainder ("/docs/page.gmi")
//!     → resolver.rs (join with root, normalize, containment check)
//!     → filesystem metadata
//!     → directory: redirect to trailing slash, else serve index file
//!     → file: read bytes, mime.rs lookup by extension
//!     → Response (20 with body, 30 redirect, or 51)
//! ```
//!
//! # Design Decisions
//! - Resolution violations surface as 51, indistinguishable from a
//!   missing file (no probe feedback for traversal attempts)
//! - The mime registry is a per-server value, not a global
//! - Unexpected I/O errors propagate as handler errors and become 40
//!   at the catch-all stage

pub mod mime;
pub mod resolver;

use std::path::PathBuf;

use crate::middleware::Handler;
use crate::protocol::{Request, Response};

pub use mime::MimeTypes;
pub use resolver::{resolve, ResolveError};

/// Build a file-serving handler rooted at `root`.
///
/// Intended as a route fallback: it serves whatever remainder the
/// routing tree left on the request. Directories serve `index_file`;
/// a directory URI missing its trailing slash redirects so relative
/// links inside the served document resolve correctly.
pub fn serve_files(
    root: impl Into<PathBuf>,
    index_file: impl Into<String>,
    mime: MimeTypes,
) -> Handler {
    let root = root.into();
    let index_file = index_file.into();

    Handler::new(move |req: Request| {
        let root = root.clone();
        let index_file = index_file.clone();
        let mime = mime.clone();
        async move {
            let rest = req.remaining_path();
            let resolved = match resolver::resolve(&root, &rest) {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!(path = %rest, error = %e, "path resolution refused");
                    return Ok(Response::not_found("not found"));
                }
            };

            let metadata = match tokio::fs::metadata(&resolved).await {
                Ok(metadata) => metadata,
                Err(e) if not_visible(&e) => return Ok(Response::not_found("not found")),
                Err(e) => return Err(e.into()),
            };

            let file_path = if metadata.is_dir() {
                if !req.path().ends_with('/') {
                    let mut uri = req.uri().clone();
                    uri.set_path(&format!("{}/", req.path()));
                    return Ok(Response::redirect(uri.as_str()));
                }
                resolved.join(&index_file)
            } else {
                resolved
            };

            match tokio::fs::read(&file_path).await {
                Ok(bytes) => {
                    let mime_type = mime.lookup(&file_path).to_string();
                    Ok(Response::success(mime_type, bytes))
                }
                Err(e) if not_visible(&e) => Ok(Response::not_found("not found")),
                Err(e) => Err(e.into()),
            }
        }
    })
}

/// Errors reported to the client as a plain 51, without detail.
fn not_visible(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
    )
}
