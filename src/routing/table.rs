//! Declarative route tables and tree construction.

use thiserror::Error;

use super::tree::{Capture, RouteNode};
use crate::middleware::{compose, Handler, Middleware};

/// One route table entry.
///
/// The path may span several segments (`"/users/:name"`); it is expanded
/// into nested single-segment nodes at build time. Segments starting
/// with `:` capture the matched value under that parameter name.
pub struct Route {
    path: String,
    handler: Option<Handler>,
    fallback: Option<Handler>,
    middleware: Vec<Middleware>,
    nested: Vec<Route>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handler: None,
            fallback: None,
            middleware: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Handler invoked on an exact match of this entry's path.
    ///
    /// When the path ends in a capture segment and no explicit fallback
    /// is given, the handler also receives requests extending past the
    /// capture, with the unmatched remainder on the request.
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Handler invoked when the walk gets stuck at this entry's node; it
    /// receives the unmatched remainder of the path. This is how a
    /// subtree opts into catch-all behavior (e.g. file serving).
    pub fn fallback(mut self, handler: Handler) -> Self {
        self.fallback = Some(handler);
        self
    }

    /// Append a middleware stage. Stages wrap this entry's handlers and
    /// every nested entry, in declaration order (first is outermost).
    pub fn middleware(mut self, stage: Middleware) -> Self {
        self.middleware.push(stage);
        self
    }

    /// Nest a sub-table entry. Its path is relative to this entry's path.
    pub fn nest(mut self, route: Route) -> Self {
        self.nested.push(route);
        self
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("handler", &self.handler.is_some())
            .field("fallback", &self.fallback.is_some())
            .field("middleware", &self.middleware.len())
            .field("nested", &self.nested.len())
            .finish()
    }
}

/// Configuration errors detected while compiling the table. Startup
/// fails fast on any of these.
#[derive(Debug, Error)]
pub enum RouteBuildError {
    #[error("route {0:?} has neither a handler nor nested routes")]
    EmptyRoute(String),

    #[error("route {0:?} contains an invalid segment")]
    InvalidPath(String),

    #[error("route {at:?} captures {requested:?} but the node already captures {existing:?}")]
    CaptureConflict {
        at: String,
        existing: String,
        requested: String,
    },

    #[error("route {0:?} is declared more than once")]
    DuplicateRoute(String),
}

/// Compile a declarative table into an immutable routing tree.
///
/// Per-node middleware is composed into the stored handlers here, once,
/// so dispatch never re-interprets the stage list.
pub fn build_routes(routes: Vec<Route>) -> Result<RouteNode, RouteBuildError> {
    let mut root = RouteNode::empty();
    for route in routes {
        insert(&mut root, route, &[], "")?;
    }
    Ok(root)
}

fn insert(
    parent: &mut RouteNode,
    route: Route,
    inherited: &[Middleware],
    prefix: &str,
) -> Result<(), RouteBuildError> {
    let Route {
        path,
        handler,
        fallback,
        middleware,
        nested,
    } = route;

    let full_path = join_paths(prefix, &path);
    if handler.is_none() && fallback.is_none() && nested.is_empty() {
        return Err(RouteBuildError::EmptyRoute(full_path));
    }

    let mut stack = inherited.to_vec();
    stack.extend(middleware);

    let mut node = parent;
    let mut last_was_capture = false;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() {
                return Err(RouteBuildError::InvalidPath(full_path));
            }
            node = capture_child(node, name, &full_path)?;
            last_was_capture = true;
        } else {
            node = node.children.entry(segment.to_string()).or_default();
            last_was_capture = false;
        }
    }

    if let Some(handler) = handler {
        if node.handler.is_some() {
            return Err(RouteBuildError::DuplicateRoute(full_path));
        }
        let composed = compose(&stack, handler);
        if last_was_capture && fallback.is_none() && node.fallback.is_none() {
            node.fallback = Some(composed.clone());
        }
        node.handler = Some(composed);
    }

    if let Some(fallback) = fallback {
        if node.fallback.is_some() {
            return Err(RouteBuildError::DuplicateRoute(full_path));
        }
        node.fallback = Some(compose(&stack, fallback));
    }

    for child in nested {
        insert(node, child, &stack, &full_path)?;
    }
    Ok(())
}

fn capture_child<'a>(
    node: &'a mut RouteNode,
    name: &str,
    at: &str,
) -> Result<&'a mut RouteNode, RouteBuildError> {
    let capture = node.capture.get_or_insert_with(|| Capture {
        name: name.to_string(),
        node: Box::new(RouteNode::empty()),
    });
    if capture.name != name {
        return Err(RouteBuildError::CaptureConflict {
            at: at.to_string(),
            existing: capture.name.clone(),
            requested: name.to_string(),
        });
    }
    Ok(&mut capture.node)
}

fn join_paths(prefix: &str, path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), trimmed)
    }
}
