//! Gemini response protocol.
//!
//! # Responsibilities
//! - Represent a reply as status + meta + optional body
//! - Provide total constructors for the fixed status taxonomy
//! - Serialize the reply into its wire form
//!
//! # Design Decisions
//! - Closed status set instead of free-form codes
//! - Body bytes are only ever written for status 20
//! - A response is immutable once constructed and consumed exactly once
//!   by the connection writer

/// Two-digit Gemini status code.
///
/// The tens digit denotes the class: 2x success, 3x redirect, 4x temporary
/// failure, 5x permanent failure, 6x certificate-related.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 20: success. Meta is the body's mime type.
    Success = 20,
    /// 30: temporary redirect. Meta is the target URI.
    RedirectTemporary = 30,
    /// 31: permanent redirect. Meta is the target URI.
    RedirectPermanent = 31,
    /// 40: unknown server error. Meta is a human-readable message.
    UnknownServerError = 40,
    /// 51: not found. Meta is a human-readable message.
    NotFound = 51,
    /// 59: bad request (malformed or oversized request line).
    BadRequest = 59,
    /// 60: client certificate required.
    CertificateRequired = 60,
    /// 61: client certificate not authorized.
    CertificateNotAuthorized = 61,
    /// 62: client certificate invalid.
    CertificateInvalid = 62,
}

impl Status {
    /// The numeric wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this status carries a body (2x class).
    pub fn is_success(self) -> bool {
        self.code() / 10 == 2
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single Gemini reply.
///
/// Wire form is `"<status> <meta>\r\n"` followed by raw body bytes for
/// status 20 only. The connection closes after the reply is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    meta: String,
    body: Option<Vec<u8>>,
}

impl Response {
    /// 20 success with the given mime type and body.
    pub fn success(mime: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Status::Success,
            meta: mime.into(),
            body: Some(body.into()),
        }
    }

    /// 30 temporary redirect to the given URI.
    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            status: Status::RedirectTemporary,
            meta: target.into(),
            body: None,
        }
    }

    /// 31 permanent redirect to the given URI.
    pub fn permanent_redirect(target: impl Into<String>) -> Self {
        Self {
            status: Status::RedirectPermanent,
            meta: target.into(),
            body: None,
        }
    }

    /// 40 unknown server error with a generic message.
    ///
    /// Internal error detail belongs in the log, never on the wire.
    pub fn unknown_server_error() -> Self {
        Self {
            status: Status::UnknownServerError,
            meta: "unknown server error".to_string(),
            body: None,
        }
    }

    /// 51 not found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: Status::NotFound,
            meta: message.into(),
            body: None,
        }
    }

    /// 59 bad request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: Status::BadRequest,
            meta: message.into(),
            body: None,
        }
    }

    /// 60 client certificate required.
    pub fn certificate_required(message: impl Into<String>) -> Self {
        Self {
            status: Status::CertificateRequired,
            meta: message.into(),
            body: None,
        }
    }

    /// 61 client certificate not authorized.
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self {
            status: Status::CertificateNotAuthorized,
            meta: message.into(),
            body: None,
        }
    }

    /// 62 client certificate invalid.
    pub fn certificate_invalid(message: impl Into<String>) -> Self {
        Self {
            status: Status::CertificateInvalid,
            meta: message.into(),
            body: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Meta line: mime type for success, message for errors, target URI
    /// for redirects.
    pub fn meta(&self) -> &str {
        &self.meta
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Serialize into wire form, consuming the response.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = format!("{} {}\r\n", self.status.code(), self.meta).into_bytes();
        if self.status.is_success() {
            if let Some(body) = self.body {
                out.extend_from_slice(&body);
            }
        }
        out
    }
}
