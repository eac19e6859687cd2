//! Per-request key pair and CSR generation.
//!
//! A fresh ECDSA P-256 key is generated for every issuance attempt and is
//! never reused: a key tied to a failed attestation is simply dropped.

use ca_init_core::error::{PkiError, Result};
use ca_init_core::pki::{CertificateSigningRequest, DomainSet};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_ECDSA_P256_SHA256};

/// Key material for one issuance attempt.
pub struct KeyMaterial {
    private_key_pem: String,
    public_key_der: Vec<u8>,
    csr_pem: String,
}

impl KeyMaterial {
    /// Generate a key pair and a CSR covering `domains`.
    pub fn generate(domains: &DomainSet) -> Result<Self> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| PkiError::KeyGeneration(format!("P-256 key pair: {}", e)))?;

        let mut params = CertificateParams::new(domains.as_slice().to_vec())
            .map_err(|e| PkiError::Config(format!("invalid domain name: {}", e)))?;

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, domains.primary());
        params.distinguished_name = dn;

        let csr = params
            .serialize_request(&key_pair)
            .map_err(|e| PkiError::KeyGeneration(format!("CSR: {}", e)))?;
        let csr_pem = csr
            .pem()
            .map_err(|e| PkiError::KeyGeneration(format!("CSR PEM encoding: {}", e)))?;

        Ok(Self {
            private_key_pem: key_pair.serialize_pem(),
            public_key_der: key_pair.public_key_der(),
            csr_pem,
        })
    }

    /// DER public key bound into the attestation report data.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    pub fn signing_request(&self, domains: DomainSet) -> CertificateSigningRequest {
        CertificateSigningRequest {
            csr_pem: self.csr_pem.clone(),
            domains,
        }
    }

    /// Consume the material, keeping only the private key.
    pub fn into_private_key_pem(self) -> String {
        self.private_key_pem
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_key_der", &hex::encode(&self.public_key_der))
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_pem() {
        let domains = DomainSet::single("svc.example.com").unwrap();
        let key = KeyMaterial::generate(&domains).unwrap();
        let csr = key.signing_request(domains);
        assert!(csr.csr_pem.contains("BEGIN CERTIFICATE REQUEST"));
        assert_eq!(csr.domains.primary(), "svc.example.com");
        assert!(!key.public_key_der().is_empty());
        assert!(key.into_private_key_pem().contains("PRIVATE KEY"));
    }

    #[test]
    fn test_each_generation_is_fresh() {
        let domains = DomainSet::single("svc.example.com").unwrap();
        let a = KeyMaterial::generate(&domains).unwrap();
        let b = KeyMaterial::generate(&domains).unwrap();
        assert_ne!(a.public_key_der(), b.public_key_der());
        assert_ne!(a.into_private_key_pem(), b.into_private_key_pem());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let key = KeyMaterial::generate(&DomainSet::single("a.example").unwrap()).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("PRIVATE KEY"));
    }
}
