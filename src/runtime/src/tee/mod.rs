//! TEE (Trusted Execution Environment) evidence generation.
//!
//! - `provider`: the `EvidenceProvider` capability and platform selection.
//! - `quote`: hardware quote sources and quote layout checks.
//! - `tdx`, `snp`, `sgx`: per-platform detection and quote sources.
//! - `untrusted`: placeholder evidence for the no-TEE fallback.

pub mod provider;
pub mod quote;
pub mod sgx;
pub mod snp;
pub mod tdx;
pub mod untrusted;

use ca_init_core::PlatformKind;

pub use provider::{select_evidence_provider, EvidenceProvider, HardwareProvider};
pub use quote::{QuoteLayout, QuoteSource, SGX_QUOTE_LAYOUT, SNP_REPORT_LAYOUT, TDX_QUOTE_LAYOUT};
pub use sgx::GramineQuoteSource;
pub use snp::SnpQuoteSource;
pub use tdx::TdxQuoteSource;
pub use untrusted::{UntrustedProvider, UNTRUSTED_PLACEHOLDER};

/// Probe the host for a TEE guest interface.
///
/// Never returns [`PlatformKind::Untrusted`]; the absence of a TEE is `None`.
pub fn detect_platform() -> Option<PlatformKind> {
    if tdx::detect_platform() {
        return Some(PlatformKind::Tdx);
    }
    if sgx::detect_platform() {
        return Some(PlatformKind::Sgx);
    }
    if snp::detect_platform() {
        return Some(PlatformKind::SevSnp);
    }
    None
}
