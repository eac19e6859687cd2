//! AMD SEV-SNP guest support.
//!
//! Reports come from the `SNP_GET_REPORT` ioctl on `/dev/sev-guest`.

use ca_init_core::error::{PkiError, Result};
use ca_init_core::pki::ReportData;
use std::path::{Path, PathBuf};

use super::quote::QuoteSource;

/// SEV guest device node.
pub const SEV_GUEST_DEVICE: &str = "/dev/sev-guest";

/// Platform device registered by the SEV guest driver.
const SEV_GUEST_PLATFORM: &str = "sys/devices/platform/sev-guest";

/// Whether this machine looks like a SEV-SNP guest.
pub fn detect_platform() -> bool {
    detect_in(Path::new("/"))
}

/// Detection against an alternate filesystem root.
pub fn detect_in(root: &Path) -> bool {
    root.join(SEV_GUEST_DEVICE.trim_start_matches('/')).exists()
        || root.join(SEV_GUEST_PLATFORM).exists()
}

/// SEV-SNP report source backed by the guest device.
#[derive(Debug, Clone)]
pub struct SnpQuoteSource {
    device: PathBuf,
}

impl Default for SnpQuoteSource {
    fn default() -> Self {
        Self::new(SEV_GUEST_DEVICE)
    }
}

impl SnpQuoteSource {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl QuoteSource for SnpQuoteSource {
    fn name(&self) -> &'static str {
        "sev-guest"
    }

    fn get_quote(&self, report_data: &ReportData) -> Result<Vec<u8>> {
        snp_get_report(&self.device, report_data)
    }
}

// ============================================================================
// SNP ioctl interface (linux/sev-guest.h)
// ============================================================================

/// `_IOWR('S', 0x0, struct snp_guest_request_ioctl)`, struct size 32.
#[cfg(target_os = "linux")]
const SNP_GET_REPORT_IOCTL: libc::c_ulong = 0xc020_5300;

/// Kernel response buffer size (`struct snp_report_resp`).
#[cfg(target_os = "linux")]
const SNP_RESP_SIZE: usize = 4000;

/// Offset of the report inside the response (status, size, 24 reserved bytes).
#[cfg(target_os = "linux")]
const SNP_RESP_REPORT_OFFSET: usize = 0x20;

#[cfg(target_os = "linux")]
#[repr(C)]
struct SnpReportReq {
    user_data: [u8; 64],
    vmpl: u32,
    rsvd: [u8; 28],
}

#[cfg(target_os = "linux")]
#[repr(C)]
struct SnpReportResp {
    data: [u8; SNP_RESP_SIZE],
}

#[cfg(target_os = "linux")]
#[repr(C)]
struct SnpGuestRequestIoctl {
    msg_version: u8,
    req_data: u64,
    resp_data: u64,
    exitinfo2: u64,
}

#[cfg(target_os = "linux")]
fn snp_get_report(device: &Path, report_data: &ReportData) -> Result<Vec<u8>> {
    use std::fs::OpenOptions;
    use std::os::fd::AsRawFd;

    let dev = OpenOptions::new()
        .read(true)
        .write(true)
        .open(device)
        .map_err(|e| {
            PkiError::EvidenceUnavailable(format!(
                "Cannot open {}: {} (is this a SEV-SNP guest?)",
                device.display(),
                e
            ))
        })?;

    let req = SnpReportReq {
        user_data: *report_data.as_bytes(),
        vmpl: 0,
        rsvd: [0u8; 28],
    };
    let mut resp = SnpReportResp {
        data: [0u8; SNP_RESP_SIZE],
    };
    let mut ioctl_req = SnpGuestRequestIoctl {
        msg_version: 1,
        req_data: &req as *const _ as u64,
        resp_data: &mut resp as *mut _ as u64,
        exitinfo2: 0,
    };

    // SAFETY: req/resp outlive the call and match the kernel ABI sizes.
    let ret = unsafe { libc::ioctl(dev.as_raw_fd(), SNP_GET_REPORT_IOCTL, &mut ioctl_req as *mut _) };
    if ret != 0 {
        let errno = std::io::Error::last_os_error();
        return Err(PkiError::EvidenceUnavailable(format!(
            "SNP_GET_REPORT ioctl failed: {} (fw_err: {:#x})",
            errno, ioctl_req.exitinfo2
        )));
    }

    parse_report_response(&resp.data)
}

#[cfg(not(target_os = "linux"))]
fn snp_get_report(device: &Path, _report_data: &ReportData) -> Result<Vec<u8>> {
    Err(PkiError::EvidenceUnavailable(format!(
        "{} requires a Linux SEV-SNP guest",
        device.display()
    )))
}

/// Extract the report from a `snp_report_resp` buffer.
#[cfg(target_os = "linux")]
fn parse_report_response(data: &[u8]) -> Result<Vec<u8>> {
    let status = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if status != 0 {
        return Err(PkiError::EvidenceUnavailable(format!(
            "SNP_GET_REPORT firmware error: {:#x}",
            status
        )));
    }

    let size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let end = SNP_RESP_REPORT_OFFSET + size;
    if size == 0 || end > data.len() {
        return Err(PkiError::EvidenceUnavailable(format!(
            "SNP_GET_REPORT returned invalid report size {}",
            size
        )));
    }

    Ok(data[SNP_RESP_REPORT_OFFSET..end].to_vec())
}
