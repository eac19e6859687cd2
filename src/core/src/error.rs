use std::path::PathBuf;

use thiserror::Error;

/// Certificate issuance error types
#[derive(Error, Debug)]
pub enum PkiError {
    /// Platform name not recognized, or no TEE detected in `auto` mode
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The local platform cannot produce attestation evidence
    #[error("Evidence unavailable: {0}")]
    EvidenceUnavailable(String),

    /// Transport-level failure reaching the CA (DNS, TLS, refused, timeout)
    #[error("CA service unreachable: {0}")]
    ServiceUnreachable(String),

    /// CA reachable but answered with a non-success status
    #[error("CA service error: {status} - {message}")]
    ServiceError { status: u16, message: String },

    /// Response body does not match the expected schema
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// CA explicitly rejected the evidence
    #[error("Attestation rejected: {0}")]
    AttestationRejected(String),

    /// Reading the trust bundle or writing output files failed
    #[error("File system error: {}: {source}", path.display())]
    FileSystemError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key pair or CSR generation failed
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PkiError {
    /// Build a [`PkiError::FileSystemError`] for `path`.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PkiError::FileSystemError {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for PkiError {
    fn from(err: serde_json::Error) -> Self {
        PkiError::ProtocolError(err.to_string())
    }
}

/// Result type alias for certificate issuance operations
pub type Result<T> = std::result::Result<T, PkiError>;
