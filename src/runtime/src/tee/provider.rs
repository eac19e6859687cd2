//! Evidence providers and platform selection.

use ca_init_core::error::Result;
use ca_init_core::pki::{Challenge, Evidence};
use ca_init_core::PlatformKind;

use super::quote::{
    QuoteLayout, QuoteSource, SGX_QUOTE_LAYOUT, SNP_REPORT_LAYOUT, TDX_QUOTE_LAYOUT,
};
use super::sgx::GramineQuoteSource;
use super::snp::SnpQuoteSource;
use super::tdx::TdxQuoteSource;
use super::untrusted::UntrustedProvider;

/// Produces evidence proving the caller's execution environment.
///
/// `produce_evidence` may block on a platform driver; async callers should
/// run it on a blocking thread.
pub trait EvidenceProvider: Send + Sync {
    /// Platform this provider speaks for.
    fn platform(&self) -> PlatformKind;

    /// Evidence bound to `challenge` and the requester's `public_key`.
    fn produce_evidence(&self, challenge: &Challenge, public_key: &[u8]) -> Result<Evidence>;
}

/// Hardware-backed provider: report data in, validated quote out.
#[derive(Debug)]
pub struct HardwareProvider<S> {
    platform: PlatformKind,
    layout: QuoteLayout,
    source: S,
}

impl<S: QuoteSource> HardwareProvider<S> {
    pub fn tdx(source: S) -> Self {
        Self {
            platform: PlatformKind::Tdx,
            layout: TDX_QUOTE_LAYOUT,
            source,
        }
    }

    pub fn sev_snp(source: S) -> Self {
        Self {
            platform: PlatformKind::SevSnp,
            layout: SNP_REPORT_LAYOUT,
            source,
        }
    }

    pub fn sgx(source: S) -> Self {
        Self {
            platform: PlatformKind::Sgx,
            layout: SGX_QUOTE_LAYOUT,
            source,
        }
    }
}

impl<S: QuoteSource> EvidenceProvider for HardwareProvider<S> {
    fn platform(&self) -> PlatformKind {
        self.platform
    }

    fn produce_evidence(&self, challenge: &Challenge, public_key: &[u8]) -> Result<Evidence> {
        let report_data = challenge.report_data(public_key);
        let started = std::time::Instant::now();

        let quote = self.source.get_quote(&report_data)?;
        self.layout.verify(&quote, &report_data)?;

        tracing::info!(
            platform = %self.platform,
            source = self.source.name(),
            quote_size = quote.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Produced attestation evidence"
        );

        Ok(Evidence::new(self.platform, quote))
    }
}

/// Map a platform to its evidence provider.
///
/// `untrusted_placeholder` is only used by [`PlatformKind::Untrusted`].
pub fn select_evidence_provider(
    platform: PlatformKind,
    untrusted_placeholder: Vec<u8>,
) -> Box<dyn EvidenceProvider> {
    match platform {
        PlatformKind::Untrusted => Box::new(UntrustedProvider::new(untrusted_placeholder)),
        PlatformKind::Tdx => Box::new(HardwareProvider::tdx(TdxQuoteSource::default())),
        PlatformKind::SevSnp => Box::new(HardwareProvider::sev_snp(SnpQuoteSource::default())),
        PlatformKind::Sgx => Box::new(HardwareProvider::sgx(GramineQuoteSource::default())),
    }
}
