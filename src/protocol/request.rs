//! Request envelope parsing.
//!
//! # Responsibilities
//! - Read one CRLF-terminated request line, capped at 1024 bytes
//! - Parse the line into an absolute URI
//! - Split the path into non-empty, percent-decoded segments
//! - Carry connection metadata and captured route parameters
//!
//! # Design Decisions
//! - The byte cap is enforced before parsing (early rejection)
//! - Decoded segments may not reintroduce separators (`%2F`) — rejected
//!   as bad requests so traversal checks see every component
//! - A URI that parses but has no path component is an internal-error
//!   condition (status 40), not a client error

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use url::Url;

use crate::net::connection::ConnectionInfo;

/// Maximum length of a request line in bytes, excluding CRLF
/// (Gemini specification limit).
pub const MAX_REQUEST_LINE: usize = 1024;

/// Error type for request parsing. All variants except [`Io`] and
/// [`NoPath`] map to status 59 on the wire.
///
/// [`Io`]: RequestError::Io
/// [`NoPath`]: RequestError::NoPath
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request line exceeds {MAX_REQUEST_LINE} bytes")]
    TooLong,

    #[error("request line is not CRLF terminated")]
    MissingTerminator,

    #[error("connection closed before a request line arrived")]
    Closed,

    #[error("request line is not valid UTF-8")]
    InvalidEncoding,

    #[error("invalid request uri: {0}")]
    InvalidUri(#[from] url::ParseError),

    #[error("path segment decodes to a forbidden character")]
    ForbiddenSegment,

    #[error("request uri has no path component")]
    NoPath,

    #[error("i/o error reading request line: {0}")]
    Io(#[from] std::io::Error),
}

/// One parsed Gemini request.
///
/// Built incrementally by pipeline stages: the parser fills the URI and
/// path fields, the routing tree consumes `remaining` segments and binds
/// `params` while descending.
#[derive(Debug, Clone)]
pub struct Request {
    raw_line: String,
    uri: Url,
    path: String,
    remaining: Vec<String>,
    params: HashMap<String, String>,
    conn: ConnectionInfo,
}

impl Request {
    /// Read and parse one request line from the connection.
    ///
    /// Reads at most `MAX_REQUEST_LINE + 2` bytes; anything longer without
    /// a line terminator is rejected before URI parsing.
    pub async fn read<R>(reader: &mut R, conn: ConnectionInfo) -> Result<Self, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::with_capacity(128);
        let mut capped = (&mut *reader).take((MAX_REQUEST_LINE + 2) as u64);
        let n = capped.read_until(b'\n', &mut buf).await?;

        if n == 0 {
            return Err(RequestError::Closed);
        }
        if !buf.ends_with(b"\n") {
            // Hit the cap (or EOF) without a terminator.
            return if n > MAX_REQUEST_LINE + 1 {
                Err(RequestError::TooLong)
            } else {
                Err(RequestError::MissingTerminator)
            };
        }
        buf.pop();
        if !buf.ends_with(b"\r") {
            return Err(RequestError::MissingTerminator);
        }
        buf.pop();
        if buf.len() > MAX_REQUEST_LINE {
            return Err(RequestError::TooLong);
        }

        let line = std::str::from_utf8(&buf).map_err(|_| RequestError::InvalidEncoding)?;
        Self::from_line(line, conn)
    }

    /// Parse an already-read request line (without CRLF).
    pub fn from_line(line: &str, conn: ConnectionInfo) -> Result<Self, RequestError> {
        let uri = Url::parse(line)?;
        if uri.cannot_be_a_base() {
            // Parsed, but there is no path to route on. The caller surfaces
            // this as status 40, not 59.
            return Err(RequestError::NoPath);
        }

        let path = uri.path().to_string();
        let mut remaining = Vec::new();
        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| RequestError::InvalidEncoding)?;
            if decoded.contains('/') || decoded.contains('\0') {
                return Err(RequestError::ForbiddenSegment);
            }
            remaining.push(decoded.into_owned());
        }

        Ok(Self {
            raw_line: line.to_string(),
            uri,
            path,
            remaining,
            params: HashMap::new(),
            conn,
        })
    }

    /// The raw request line as received, without CRLF.
    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Full request path as sent by the client (percent-encoded form).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path segments not yet consumed by routing. Never contains empty
    /// segments or separators.
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// The unconsumed path rebuilt as a `/`-joined string, e.g. `"/posts"`.
    /// An empty remainder yields `"/"`.
    pub fn remaining_path(&self) -> String {
        let mut out = String::from("/");
        out.push_str(&self.remaining.join("/"));
        out
    }

    /// Route parameters captured so far. Additive across nested route
    /// levels; a deeper capture with the same name shadows the shallower.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Mutable access for pipeline stages that enrich the request.
    pub fn params_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.params
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.conn
    }

    /// Consume the next remaining segment (routing descent).
    pub(crate) fn advance(&mut self) -> Option<String> {
        if self.remaining.is_empty() {
            None
        } else {
            Some(self.remaining.remove(0))
        }
    }

    pub(crate) fn bind_param(&mut self, name: &str, value: String) {
        self.params.insert(name.to_string(), value);
    }

    #[cfg(test)]
    pub(crate) fn for_path(path: &str) -> Self {
        Self::from_line(
            &format!("gemini://localhost{path}"),
            ConnectionInfo::for_tests(),
        )
        .expect("test path must parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn read_line(line: &[u8]) -> Result<Request, RequestError> {
        let mut reader = BufReader::new(line);
        Request::read(&mut reader, ConnectionInfo::for_tests()).await
    }

    #[tokio::test]
    async fn parses_simple_request() {
        let req = read_line(b"gemini://example.org/users/alice\r\n")
            .await
            .unwrap();
        assert_eq!(req.path(), "/users/alice");
        assert_eq!(req.remaining(), ["users", "alice"]);
        assert!(req.params().is_empty());
    }

    #[tokio::test]
    async fn discards_empty_segments() {
        let req = read_line(b"gemini://example.org//a///b/\r\n").await.unwrap();
        assert_eq!(req.remaining(), ["a", "b"]);
    }

    #[tokio::test]
    async fn root_path_has_no_segments() {
        let req = read_line(b"gemini://example.org/\r\n").await.unwrap();
        assert!(req.remaining().is_empty());
        assert_eq!(req.remaining_path(), "/");
    }

    #[tokio::test]
    async fn decodes_percent_encoded_segments() {
        let req = read_line(b"gemini://example.org/a%20b/c.gmi\r\n")
            .await
            .unwrap();
        assert_eq!(req.remaining(), ["a b", "c.gmi"]);
    }

    #[tokio::test]
    async fn url_parser_collapses_dot_segments() {
        // The WHATWG parser resolves "..", including its encoded form, so
        // request paths arrive dot-free. The path resolver defends again
        // for paths built outside the parser.
        let req = read_line(b"gemini://example.org/a/%2e%2e/b\r\n")
            .await
            .unwrap();
        assert_eq!(req.remaining(), ["b"]);
    }

    #[tokio::test]
    async fn rejects_encoded_separator() {
        let err = read_line(b"gemini://example.org/a%2Fb\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::ForbiddenSegment));

        // "..%2F" survives WHATWG dot-segment handling (it does not decode
        // to exactly "..") and must not smuggle a separator through.
        let err = read_line(b"gemini://example.org/%2e%2e%2f/etc\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::ForbiddenSegment));
    }

    #[tokio::test]
    async fn rejects_oversized_line() {
        let mut line = b"gemini://example.org/".to_vec();
        line.extend(std::iter::repeat(b'a').take(MAX_REQUEST_LINE));
        line.extend_from_slice(b"\r\n");
        let err = read_line(&line).await.unwrap_err();
        assert!(matches!(err, RequestError::TooLong));
    }

    #[tokio::test]
    async fn line_at_exactly_the_cap_is_accepted() {
        let prefix = "gemini://example.org/";
        let mut line = prefix.to_string();
        line.push_str(&"a".repeat(MAX_REQUEST_LINE - prefix.len()));
        line.push_str("\r\n");
        assert!(read_line(line.as_bytes()).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_bare_lf() {
        let err = read_line(b"gemini://example.org/\n").await.unwrap_err();
        assert!(matches!(err, RequestError::MissingTerminator));
    }

    #[tokio::test]
    async fn rejects_unterminated_line() {
        let err = read_line(b"gemini://example.org/").await.unwrap_err();
        assert!(matches!(err, RequestError::MissingTerminator));
    }

    #[tokio::test]
    async fn rejects_closed_connection() {
        let err = read_line(b"").await.unwrap_err();
        assert!(matches!(err, RequestError::Closed));
    }

    #[tokio::test]
    async fn rejects_non_uri_line() {
        let err = read_line(b"not a uri at all\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn pathless_uri_is_an_internal_error() {
        let err = read_line(b"mailto:someone@example.org\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::NoPath));
    }

    #[test]
    fn remaining_path_rebuilds_slash_joined() {
        let mut req = Request::for_path("/users/alice/posts");
        req.advance();
        req.advance();
        assert_eq!(req.remaining_path(), "/posts");
    }
}
