//! ca-initializer core - data model, errors and configuration.
//!
//! Types shared by the attestation runtime and the CLI.

pub mod config;
pub mod error;
pub mod pki;
pub mod platform;

// Re-export commonly used types
pub use config::{ApiPath, IssuerConfig, LogLevel, OutputLayout, TimeoutConfig};
pub use error::{PkiError, Result};
pub use pki::{
    CertificateBundle, CertificateSigningRequest, Challenge, DomainSet, Evidence,
    IssuedCertificate, ReportData, REPORT_DATA_SIZE,
};
pub use platform::PlatformKind;

/// ca-initializer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
