//! The routing tree and its dispatch walk.

use std::collections::HashMap;
use std::sync::Arc;

use crate::middleware::{BoxHandlerFuture, Handler};
use crate::protocol::{Request, Response};

/// One node of the routing tree.
///
/// Handlers stored here are already wrapped by this node's and all
/// ancestor middleware (composed at build time). The tree is immutable
/// after [`build_routes`](crate::routing::build_routes) returns.
pub struct RouteNode {
    /// Invoked when the walk ends exactly here.
    pub(crate) handler: Option<Handler>,
    /// Invoked when the walk gets stuck here, receiving the unmatched
    /// remainder of the path.
    pub(crate) fallback: Option<Handler>,
    pub(crate) children: HashMap<String, RouteNode>,
    pub(crate) capture: Option<Capture>,
}

/// A parameter-capturing child. At most one per node.
pub(crate) struct Capture {
    pub(crate) name: String,
    pub(crate) node: Box<RouteNode>,
}

impl Default for RouteNode {
    fn default() -> Self {
        Self::empty()
    }
}

impl RouteNode {
    pub(crate) fn empty() -> Self {
        Self {
            handler: None,
            fallback: None,
            children: HashMap::new(),
            capture: None,
        }
    }

    /// Match the request's remaining segments against the tree and invoke
    /// the selected handler.
    ///
    /// Walk order per segment: literal child, then capture child (binding
    /// the parameter), otherwise the current node's fallback with the
    /// remainder, otherwise status 51. No backtracking: once descent
    /// consumed a segment, shallower fallbacks are out of reach.
    pub fn route(&self, mut req: Request) -> BoxHandlerFuture {
        let mut node = self;
        loop {
            let Some(next) = req.remaining().first().cloned() else {
                return match (&node.handler, &node.fallback) {
                    (Some(handler), _) => handler.call(req),
                    (None, Some(fallback)) => fallback.call(req),
                    (None, None) => not_found(),
                };
            };

            if let Some(child) = node.children.get(next.as_str()) {
                req.advance();
                node = child;
                continue;
            }

            if let Some(capture) = &node.capture {
                req.advance();
                req.bind_param(&capture.name, next);
                node = &capture.node;
                continue;
            }

            return match &node.fallback {
                Some(fallback) => fallback.call(req),
                None => not_found(),
            };
        }
    }

    /// Wrap the tree as a [`Handler`] suitable as a server root handler.
    pub fn into_handler(self) -> Handler {
        let node = Arc::new(self);
        Handler::new(move |req| {
            let node = Arc::clone(&node);
            async move { node.route(req).await }
        })
    }
}

impl std::fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteNode")
            .field("handler", &self.handler.is_some())
            .field("fallback", &self.fallback.is_some())
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("capture", &self.capture.as_ref().map(|c| &c.name))
            .finish()
    }
}

fn not_found() -> BoxHandlerFuture {
    Box::pin(async { Ok(Response::not_found("not found")) })
}
