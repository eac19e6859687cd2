//! Hardware quote sources and quote layout checks.
//!
//! A [`QuoteSource`] is the platform primitive that turns 64 bytes of
//! report data into a hardware-signed quote. The quote itself is opaque to
//! us; only the position of the report-data field is known so the echo can
//! be checked before the quote leaves the machine.

use ca_init_core::error::{PkiError, Result};
use ca_init_core::pki::{ReportData, REPORT_DATA_SIZE};

/// Platform attestation primitive.
pub trait QuoteSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Produce a quote embedding `report_data`. May block on the driver.
    fn get_quote(&self, report_data: &ReportData) -> Result<Vec<u8>>;
}

impl<T: QuoteSource + ?Sized> QuoteSource for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get_quote(&self, report_data: &ReportData) -> Result<Vec<u8>> {
        (**self).get_quote(report_data)
    }
}

/// Where the report-data field lives inside a platform's quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteLayout {
    /// Human-readable quote format name
    pub format: &'static str,
    /// Minimum quote length in bytes
    pub min_len: usize,
    /// Offset of the 64-byte report-data field
    pub report_data_offset: usize,
}

/// TDX quote v4: 48-byte header, TD report body with report data at +520.
pub const TDX_QUOTE_LAYOUT: QuoteLayout = QuoteLayout {
    format: "TDX quote",
    min_len: 48 + 584,
    report_data_offset: 48 + 520,
};

/// SEV-SNP attestation report (AMD SEV-SNP ABI, Table 21).
pub const SNP_REPORT_LAYOUT: QuoteLayout = QuoteLayout {
    format: "SEV-SNP report",
    min_len: 1184,
    report_data_offset: 0x50,
};

/// SGX DCAP quote v3: 48-byte header, enclave report body with report data at +320.
pub const SGX_QUOTE_LAYOUT: QuoteLayout = QuoteLayout {
    format: "SGX quote",
    min_len: 48 + 384,
    report_data_offset: 48 + 320,
};

impl QuoteLayout {
    /// Check that `quote` is long enough and echoes `report_data`.
    pub fn verify(&self, quote: &[u8], report_data: &ReportData) -> Result<()> {
        if quote.len() < self.min_len {
            return Err(PkiError::EvidenceUnavailable(format!(
                "malformed {}: {} bytes, expected at least {}",
                self.format,
                quote.len(),
                self.min_len
            )));
        }

        let end = self.report_data_offset + REPORT_DATA_SIZE;
        if &quote[self.report_data_offset..end] != report_data.as_bytes() {
            return Err(PkiError::EvidenceUnavailable(format!(
                "{} does not carry the requested report data",
                self.format
            )));
        }

        Ok(())
    }

    /// Build a zeroed quote of minimum size with `report_data` in place.
    ///
    /// Used by tests and fake sources; real quotes come from hardware.
    pub fn blank_quote(&self, report_data: &ReportData) -> Vec<u8> {
        let mut quote = vec![0u8; self.min_len];
        quote[self.report_data_offset..self.report_data_offset + REPORT_DATA_SIZE]
            .copy_from_slice(report_data.as_bytes());
        quote
    }
}
