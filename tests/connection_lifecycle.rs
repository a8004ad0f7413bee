//! Connection lifecycle: every accepted connection gets exactly one
//! reply and a close, even when the handler misbehaves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gemini_server::middleware::{compose, stages, Handler};
use gemini_server::net::listener::BoundedListener;
use gemini_server::protocol::{Request, Response};

mod common;

#[tokio::test]
async fn hundred_panicking_handlers_each_get_one_reply() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let panicking = Handler::new(move |_req: Request| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("handler blew up");
            #[allow(unreachable_code)]
            Ok(Response::success("text/gemini", "unreachable"))
        }
    });
    let handler = compose(&[stages::recover()], panicking);

    let listener = BoundedListener::bind("127.0.0.1:0", 4).await.unwrap();
    let addr = listener.local_addr();
    let _server = common::spawn_plain_server(listener, handler);

    for _ in 0..100 {
        let reply = common::exchange(addr, &common::request_line("/boom")).await;
        let text = String::from_utf8_lossy(&reply);
        assert!(text.starts_with("40 "), "got {text:?}");
        assert_eq!(text.matches("\r\n").count(), 1, "exactly one status line");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn well_formed_request_round_trips() {
    let handler = Handler::new(|req: Request| async move {
        Ok(Response::success(
            "text/gemini",
            format!("# you asked for {}\n", req.path()),
        ))
    });

    let listener = BoundedListener::bind("127.0.0.1:0", 4).await.unwrap();
    let addr = listener.local_addr();
    let _server = common::spawn_plain_server(listener, handler);

    let reply = common::exchange(addr, &common::request_line("/hello")).await;
    assert_eq!(
        reply,
        b"20 text/gemini\r\n# you asked for /hello\n".to_vec()
    );
}

#[tokio::test]
async fn malformed_line_gets_59_and_close() {
    let handler = Handler::new(|_req: Request| async move {
        Ok(Response::success("text/gemini", "never reached"))
    });

    let listener = BoundedListener::bind("127.0.0.1:0", 4).await.unwrap();
    let addr = listener.local_addr();
    let _server = common::spawn_plain_server(listener, handler);

    // Bare LF, no CR.
    let reply = common::exchange(addr, b"gemini://localhost/x\n").await;
    assert!(reply.starts_with(b"59 "));

    // Over the line-length cap.
    let mut wire = b"gemini://localhost/".to_vec();
    wire.extend(std::iter::repeat(b'y').take(1500));
    wire.extend_from_slice(b"\r\n");
    let reply = common::exchange(addr, &wire).await;
    assert!(reply.starts_with(b"59 "));
}
