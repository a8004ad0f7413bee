//! Stock middleware stages.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use super::{Handler, Middleware};
use crate::protocol::Response;

/// Catch-all conversion stage. The server installs this outermost on
/// every pipeline so a failing handler still yields a wire response.
///
/// Handler errors and panics are logged (summary at error level, detail
/// at debug level) and converted to status 40. The internal text never
/// reaches the client.
pub fn recover() -> Middleware {
    Middleware::new(|inner: Handler| {
        Handler::new(move |req| {
            let inner = inner.clone();
            let connection = req.connection().id;
            let path = req.path().to_string();
            async move {
                match AssertUnwindSafe(inner.call(req)).catch_unwind().await {
                    Ok(Ok(response)) => Ok(response),
                    Ok(Err(e)) => {
                        tracing::error!(connection = %connection, path = %path, error = %e, "handler failed");
                        tracing::debug!(connection = %connection, error = ?e, "handler failure detail");
                        Ok(Response::unknown_server_error())
                    }
                    Err(panic) => {
                        let message = panic_message(&panic);
                        tracing::error!(connection = %connection, path = %path, panic = %message, "handler panicked");
                        Ok(Response::unknown_server_error())
                    }
                }
            }
        })
    })
}

/// Structured request/response logging via `tracing`.
pub fn log_requests() -> Middleware {
    Middleware::new(|inner: Handler| {
        Handler::new(move |req| {
            let inner = inner.clone();
            let connection = req.connection().id;
            let peer = req.connection().peer_addr;
            let path = req.path().to_string();
            async move {
                tracing::debug!(connection = %connection, peer = %peer, path = %path, "request received");
                let result = inner.call(req).await;
                match &result {
                    Ok(response) => tracing::info!(
                        connection = %connection,
                        peer = %peer,
                        path = %path,
                        status = response.status().code(),
                        "request handled"
                    ),
                    Err(e) => tracing::warn!(
                        connection = %connection,
                        peer = %peer,
                        path = %path,
                        error = %e,
                        "request failed past the catch-all stage"
                    ),
                }
                result
            }
        })
    })
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::compose;
    use crate::protocol::Request;

    #[tokio::test]
    async fn recover_converts_errors_to_status_40() {
        let failing = Handler::new(|_req: Request| async {
            Err(crate::middleware::HandlerError::from("boom"))
        });
        let handler = compose(&[recover()], failing);
        let response = handler.call(Request::for_path("/")).await.unwrap();
        assert_eq!(response.status().code(), 40);
        // The failure text stays out of the reply.
        assert!(!response.meta().contains("boom"));
    }

    #[tokio::test]
    async fn recover_converts_panics_to_status_40() {
        let panicking = Handler::new(|_req: Request| async { panic!("handler exploded") });
        let handler = compose(&[recover()], panicking);
        let response = handler.call(Request::for_path("/")).await.unwrap();
        assert_eq!(response.status().code(), 40);
        assert!(!response.meta().contains("exploded"));
    }

    #[tokio::test]
    async fn recover_passes_successes_through() {
        let ok = Handler::new(|_req: Request| async { Ok(Response::success("text/gemini", "hi")) });
        let handler = compose(&[recover()], ok);
        let response = handler.call(Request::for_path("/")).await.unwrap();
        assert_eq!(response.status().code(), 20);
    }
}
