//! Configuration schema definitions.
//!
//! The complete configuration structure for the server. All types
//! derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, worker pool).
    pub listener: ListenerConfig,

    /// TLS certificate and key paths.
    pub tls: TlsConfig,

    /// Graceful-shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Served content settings (capsule root, mime types).
    pub content: ContentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:1965").
    pub bind_address: String,

    /// Worker-pool bound: maximum connections in flight.
    pub max_connections: usize,

    /// Whether to request (not require) client certificates during the
    /// TLS handshake.
    pub request_client_certificates: bool,

    /// Pause between half-close and drop after a reply, milliseconds.
    pub linger_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:1965".to_string(),
            max_connections: 50,
            request_client_certificates: false,
            linger_ms: 100,
        }
    }
}

/// TLS configuration. Gemini is TLS-only, so both paths are required
/// in practice; the defaults exist so a config file can omit the table
/// while being built programmatically.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Graceful-shutdown settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for in-flight connections before aborting them.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
        }
    }
}

/// Served content settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory the file handler serves from.
    pub root: String,

    /// File served for directory requests.
    pub index_file: String,

    /// Mime type for unknown extensions.
    pub default_mime_type: String,

    /// Extension → mime-type overrides layered on the built-ins.
    pub mime_types: HashMap<String, String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: "public".to_string(),
            index_file: "index.gmi".to_string(),
            default_mime_type: "application/octet-stream".to_string(),
            mime_types: HashMap::new(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
