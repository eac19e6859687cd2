//! Certificate issuance: key generation, CA client, issuance orchestration.

pub mod client;
pub mod issuer;
pub mod keys;

pub use client::{split_pem_certificates, AttestationServiceClient, HttpAttestationClient};
pub use issuer::CertificateIssuer;
pub use keys::KeyMaterial;
