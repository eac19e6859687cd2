//! Intel TDX guest support.
//!
//! Quotes come from the kernel's configfs-tsm interface: the guest driver
//! forwards the TD report to the quoting service and returns the signed quote.

use std::path::{Path, PathBuf};

use ca_init_core::error::{PkiError, Result};
use ca_init_core::pki::ReportData;

use super::quote::QuoteSource;

/// TDX guest device node.
pub const TDX_GUEST_DEVICE: &str = "/dev/tdx_guest";

/// configfs-tsm report directory.
pub const TSM_REPORT_PATH: &str = "/sys/kernel/config/tsm/report";

/// Whether this machine looks like a TDX guest.
pub fn detect_platform() -> bool {
    detect_in(Path::new("/"))
}

/// Detection against an alternate filesystem root.
pub fn detect_in(root: &Path) -> bool {
    root.join(TDX_GUEST_DEVICE.trim_start_matches('/')).exists()
}

/// Quote source backed by configfs-tsm.
#[derive(Debug, Clone)]
pub struct TdxQuoteSource {
    tsm_root: PathBuf,
}

impl Default for TdxQuoteSource {
    fn default() -> Self {
        Self::with_tsm_root(TSM_REPORT_PATH)
    }
}

impl TdxQuoteSource {
    pub fn with_tsm_root(tsm_root: impl Into<PathBuf>) -> Self {
        Self {
            tsm_root: tsm_root.into(),
        }
    }

    /// Whether the configfs-tsm report directory is mounted.
    pub fn is_available(&self) -> bool {
        self.tsm_root.is_dir()
    }
}

impl QuoteSource for TdxQuoteSource {
    fn name(&self) -> &'static str {
        "configfs-tsm"
    }

    fn get_quote(&self, report_data: &ReportData) -> Result<Vec<u8>> {
        if !self.is_available() {
            return Err(PkiError::EvidenceUnavailable(format!(
                "{} not found - configfs-tsm not mounted or no TDX guest driver",
                self.tsm_root.display()
            )));
        }
        create_quote(report_data)
    }
}

#[cfg(target_os = "linux")]
fn create_quote(report_data: &ReportData) -> Result<Vec<u8>> {
    let quote = configfs_tsm::create_tdx_quote(*report_data.as_bytes()).map_err(|e| {
        tracing::error!(error = ?e, "Failed to generate TDX quote");
        PkiError::EvidenceUnavailable(format!("TDX quote generation failed: {:?}", e))
    })?;
    tracing::debug!(quote_size = quote.len(), "Obtained TDX quote from configfs-tsm");
    Ok(quote)
}

#[cfg(not(target_os = "linux"))]
fn create_quote(_report_data: &ReportData) -> Result<Vec<u8>> {
    Err(PkiError::EvidenceUnavailable(
        "TDX quotes require a Linux TDX guest".to_string(),
    ))
}
