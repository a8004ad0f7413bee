//! TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Load certificate chain and private key from PEM files
//! - Build the rustls server configuration
//! - Optionally request client certificates, capturing presence only
//!
//! # Design Decisions
//! - The rest of the server consumes the result as an opaque
//!   [`TlsAcceptor`]; nothing outside this module touches rustls types
//! - Client certificates are never validated against a trust root —
//!   only their presence is surfaced to handlers (full authorization
//!   policy is out of scope)

use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{DigitallySignedStruct, DistinguishedName, ServerConfig, SignatureScheme};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

/// Error type for TLS setup.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate file not found: {0}")]
    CertificateNotFound(String),

    #[error("private key file not found: {0}")]
    KeyNotFound(String),

    #[error("failed to parse TLS certificate chain: {0}")]
    InvalidCertificate(std::io::Error),

    #[error("failed to read TLS private key: {0}")]
    InvalidKey(std::io::Error),

    #[error("no private key found in PEM data")]
    NoPrivateKey,

    #[error("rustls rejected the configuration: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a TLS acceptor from PEM-encoded certificate and key files.
pub fn load_tls_config(
    cert_path: &Path,
    key_path: &Path,
    request_client_certificates: bool,
) -> Result<TlsAcceptor, TlsError> {
    if !cert_path.exists() {
        return Err(TlsError::CertificateNotFound(
            cert_path.display().to_string(),
        ));
    }
    if !key_path.exists() {
        return Err(TlsError::KeyNotFound(key_path.display().to_string()));
    }

    let cert_pem = std::fs::read(cert_path)?;
    let key_pem = std::fs::read(key_path)?;
    let config = build_server_config(&cert_pem, &key_pem, request_client_certificates)?;
    Ok(TlsAcceptor::from(config))
}

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and
/// private key bytes.
pub fn build_server_config(
    cert_pem: &[u8],
    key_pem: &[u8],
    request_client_certificates: bool,
) -> Result<Arc<ServerConfig>, TlsError> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(TlsError::InvalidCertificate)?;
    if certs.is_empty() {
        return Err(TlsError::InvalidCertificate(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "no certificates in PEM data",
        )));
    }

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .map_err(TlsError::InvalidKey)?
        .ok_or(TlsError::NoPrivateKey)?;

    let builder = if request_client_certificates {
        ServerConfig::builder()
            .with_client_cert_verifier(Arc::new(CaptureClientCert::new(rustls::crypto::ring::default_provider())))
    } else {
        ServerConfig::builder().with_no_client_auth()
    };

    let config = builder.with_single_cert(certs, key)?;
    Ok(Arc::new(config))
}

/// Client-certificate verifier that accepts any certificate (and none).
///
/// Gemini clients use self-signed certificates as lightweight
/// identities; the server records that a certificate was presented and
/// leaves any policy to handlers.
#[derive(Debug)]
struct CaptureClientCert {
    provider: CryptoProvider,
}

impl CaptureClientCert {
    fn new(provider: CryptoProvider) -> Self {
        Self { provider }
    }
}

impl ClientCertVerifier for CaptureClientCert {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        false
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_cert_pem() {
        let result = build_server_config(b"", b"", false);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_garbage_pem() {
        let result = build_server_config(b"not a pem", b"also not a pem", false);
        assert!(result.is_err());
    }

    #[test]
    fn missing_files_are_reported_by_path() {
        let err = load_tls_config(
            Path::new("/definitely/not/here.pem"),
            Path::new("/also/not/here.pem"),
            false,
        )
        .err()
        .unwrap();
        assert!(matches!(err, TlsError::CertificateNotFound(path) if path.contains("here.pem")));
    }
}
