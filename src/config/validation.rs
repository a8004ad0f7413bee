//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("shutdown.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,

    #[error("content.root must not be empty")]
    EmptyContentRoot,

    #[error("content.index_file must not be empty")]
    EmptyIndexFile,

    #[error("mime type {0:?} for extension {1:?} has no type/subtype separator")]
    MalformedMimeType(String, String),

    #[error("observability.log_level {0:?} is not one of error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

/// Check everything serde cannot, collecting all failures.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }
    if config.content.root.is_empty() {
        errors.push(ValidationError::EmptyContentRoot);
    }
    if config.content.index_file.is_empty() {
        errors.push(ValidationError::EmptyIndexFile);
    }
    for (ext, mime) in &config.content.mime_types {
        if !mime.contains('/') {
            errors.push(ValidationError::MalformedMimeType(mime.clone(), ext.clone()));
        }
    }
    if !matches!(
        config.observability.log_level.as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    ) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.listener.max_connections = 0;
        config.shutdown.drain_timeout_secs = 0;
        config.content.root = String::new();
        config.observability.log_level = "verbose".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn rejects_mime_value_without_subtype() {
        let mut config = ServerConfig::default();
        config
            .content
            .mime_types
            .insert("gmi".to_string(), "gemini".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::MalformedMimeType(mime, ext)] if mime == "gemini" && ext == "gmi"
        ));
    }
}
