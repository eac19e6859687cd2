//! Intel SGX support via the Gramine attestation pseudo-filesystem.
//!
//! Inside a Gramine enclave, writing 64 bytes to `user_report_data` and then
//! reading `quote` yields a DCAP quote over that report data.

use ca_init_core::error::{PkiError, Result};
use ca_init_core::pki::ReportData;
use std::path::{Path, PathBuf};

use super::quote::QuoteSource;

/// Gramine attestation directory.
pub const GRAMINE_ATTESTATION_PATH: &str = "/dev/attestation";

/// Whether this process runs inside a Gramine SGX enclave with quoting enabled.
pub fn detect_platform() -> bool {
    detect_in(Path::new(GRAMINE_ATTESTATION_PATH))
}

/// Detection against an alternate attestation directory.
pub fn detect_in(attestation_dir: &Path) -> bool {
    attestation_dir.join("quote").exists()
}

/// Quote source backed by Gramine's `/dev/attestation` files.
#[derive(Debug, Clone)]
pub struct GramineQuoteSource {
    root: PathBuf,
}

impl Default for GramineQuoteSource {
    fn default() -> Self {
        Self::with_root(GRAMINE_ATTESTATION_PATH)
    }
}

impl GramineQuoteSource {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Attestation type configured in the Gramine manifest.
    fn attestation_type(&self) -> Result<String> {
        let path = self.root.join("attestation_type");
        let value = std::fs::read_to_string(&path).map_err(|e| {
            PkiError::EvidenceUnavailable(format!(
                "Cannot read {}: {} (is this a Gramine SGX enclave?)",
                path.display(),
                e
            ))
        })?;
        Ok(value.trim().to_string())
    }
}

impl QuoteSource for GramineQuoteSource {
    fn name(&self) -> &'static str {
        "gramine"
    }

    fn get_quote(&self, report_data: &ReportData) -> Result<Vec<u8>> {
        let attestation_type = self.attestation_type()?;
        if attestation_type == "none" {
            return Err(PkiError::EvidenceUnavailable(
                "Gramine remote attestation is disabled (attestation_type=none)".to_string(),
            ));
        }

        let user_report_data = self.root.join("user_report_data");
        std::fs::write(&user_report_data, report_data.as_bytes()).map_err(|e| {
            PkiError::EvidenceUnavailable(format!(
                "Cannot write {}: {}",
                user_report_data.display(),
                e
            ))
        })?;

        let quote_path = self.root.join("quote");
        let quote = std::fs::read(&quote_path).map_err(|e| {
            PkiError::EvidenceUnavailable(format!("Cannot read {}: {}", quote_path.display(), e))
        })?;

        tracing::debug!(
            attestation_type = %attestation_type,
            quote_size = quote.len(),
            "Obtained SGX quote from Gramine"
        );

        Ok(quote)
    }
}
