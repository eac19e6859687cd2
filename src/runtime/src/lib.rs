//! CA initializer runtime.
//!
//! Produces TEE attestation evidence, exchanges it with the CA's attestation
//! service for a certificate, and writes the result to disk.

#![allow(clippy::result_large_err)]

pub mod output;
pub mod pki;
pub mod tee;

// Re-export common types
pub use output::{CertificateWriter, OutputPaths};
pub use pki::{AttestationServiceClient, CertificateIssuer, HttpAttestationClient, KeyMaterial};
pub use tee::{detect_platform, select_evidence_provider, EvidenceProvider, UntrustedProvider};

/// CA initializer runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
