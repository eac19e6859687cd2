//! Untrusted (no-TEE) evidence.
//!
//! The CA understands a fixed, pre-shared placeholder as "no hardware
//! guarantee". Useful for development and for CAs that issue untrusted
//! certificates; the challenge content is not bound into the placeholder.

use ca_init_core::error::Result;
use ca_init_core::pki::{Challenge, Evidence};
use ca_init_core::PlatformKind;

use super::provider::EvidenceProvider;

/// Placeholder evidence bytes (`cccccc`).
pub const UNTRUSTED_PLACEHOLDER: [u8; 3] = [0xcc, 0xcc, 0xcc];

/// Provider returning a constant placeholder.
#[derive(Debug, Clone)]
pub struct UntrustedProvider {
    placeholder: Vec<u8>,
}

impl Default for UntrustedProvider {
    fn default() -> Self {
        Self::new(UNTRUSTED_PLACEHOLDER.to_vec())
    }
}

impl UntrustedProvider {
    pub fn new(placeholder: Vec<u8>) -> Self {
        Self { placeholder }
    }
}

impl EvidenceProvider for UntrustedProvider {
    fn platform(&self) -> PlatformKind {
        PlatformKind::Untrusted
    }

    fn produce_evidence(&self, _challenge: &Challenge, _public_key: &[u8]) -> Result<Evidence> {
        Ok(Evidence::new(PlatformKind::Untrusted, self.placeholder.clone()))
    }
}
