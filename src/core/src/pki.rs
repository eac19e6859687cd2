//! Challenge / evidence / certificate types exchanged with the CA.
//!
//! A single issuance moves through these types in order:
//!
//! - the CA hands out a [`Challenge`]
//! - the local platform binds it into [`Evidence`] via [`ReportData`]
//! - the CA answers with an [`IssuedCertificate`]
//! - the issuer pairs it with the local key into a [`CertificateBundle`]

use sha2::{Digest, Sha512};

use crate::error::{PkiError, Result};
use crate::platform::PlatformKind;

/// Size of the user-data field carried by TDX, SEV-SNP and SGX quotes.
pub const REPORT_DATA_SIZE: usize = 64;

/// Server-issued nonce bound to one attestation attempt.
///
/// Deliberately not `Clone`: submitting evidence consumes the challenge,
/// so a challenge can back at most one submission.
#[derive(PartialEq, Eq)]
pub struct Challenge {
    nonce: Vec<u8>,
}

impl Challenge {
    pub fn new(nonce: Vec<u8>) -> Self {
        Self { nonce }
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Report data binding this challenge to the requester's public key.
    pub fn report_data(&self, public_key: &[u8]) -> ReportData {
        ReportData::bind(&self.nonce, public_key)
    }
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Challenge")
            .field("nonce", &hex::encode(&self.nonce))
            .finish()
    }
}

/// The 64 bytes a hardware quote signs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportData([u8; REPORT_DATA_SIZE]);

impl ReportData {
    /// `SHA-512(nonce || public_key)`.
    pub fn bind(nonce: &[u8], public_key: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(nonce);
        hasher.update(public_key);
        let mut data = [0u8; REPORT_DATA_SIZE];
        data.copy_from_slice(&hasher.finalize());
        Self(data)
    }

    pub fn from_bytes(bytes: [u8; REPORT_DATA_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_DATA_SIZE] {
        &self.0
    }
}

/// Proof of the platform claim, produced locally and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    platform: PlatformKind,
    data: Vec<u8>,
}

impl Evidence {
    pub fn new(platform: PlatformKind, data: Vec<u8>) -> Self {
        Self { platform, data }
    }

    pub fn platform(&self) -> PlatformKind {
        self.platform
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Ordered, de-duplicated, non-empty set of domain names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSet(Vec<String>);

impl DomainSet {
    pub fn new<I, S>(domains: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: Vec<String> = Vec::new();
        for domain in domains {
            let domain = domain.into().trim().to_string();
            if domain.is_empty() {
                return Err(PkiError::Config("empty domain name".to_string()));
            }
            if !set.contains(&domain) {
                set.push(domain);
            }
        }
        if set.is_empty() {
            return Err(PkiError::Config(
                "at least one domain is required".to_string(),
            ));
        }
        Ok(Self(set))
    }

    pub fn single(domain: impl Into<String>) -> Result<Self> {
        Self::new([domain.into()])
    }

    /// First requested domain; names the output files.
    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// PEM CSR plus the domains it asks for.
#[derive(Debug, Clone)]
pub struct CertificateSigningRequest {
    pub csr_pem: String,
    pub domains: DomainSet,
}

/// Certificate material returned by the CA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub certificate_pem: String,
    pub ca_chain_pem: Option<String>,
}

/// Issued leaf certificate, CA chain and the matching private key.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub leaf_certificate_pem: String,
    pub ca_chain_pem: Option<String>,
    pub private_key_pem: String,
}

impl CertificateBundle {
    pub fn new(issued: IssuedCertificate, private_key_pem: String) -> Self {
        Self {
            leaf_certificate_pem: issued.certificate_pem,
            ca_chain_pem: issued.ca_chain_pem,
            private_key_pem,
        }
    }
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("leaf_certificate_pem", &self.leaf_certificate_pem)
            .field("ca_chain_pem", &self.ca_chain_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}
