//! TEE platform kinds.

use serde::{Deserialize, Serialize};

use crate::error::PkiError;

/// CPU / TEE platform the process claims to run on.
///
/// Selects the evidence strategy and is fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformKind {
    /// No hardware guarantee; evidence is a pre-shared placeholder.
    Untrusted,
    /// Intel Trust Domain Extensions.
    Tdx,
    /// AMD SEV-SNP.
    SevSnp,
    /// Intel SGX (Gramine).
    Sgx,
}

impl PlatformKind {
    /// All supported platforms.
    pub const ALL: [PlatformKind; 4] = [
        PlatformKind::Untrusted,
        PlatformKind::Tdx,
        PlatformKind::SevSnp,
        PlatformKind::Sgx,
    ];

    /// Challenge type name understood by the CA service.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PlatformKind::Untrusted => "Untrusted",
            PlatformKind::Tdx => "TDX",
            PlatformKind::SevSnp => "SEVSNP",
            PlatformKind::Sgx => "SGX",
        }
    }

    /// Whether evidence for this platform comes from a hardware primitive.
    pub fn is_hardware(&self) -> bool {
        !matches!(self, PlatformKind::Untrusted)
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl std::str::FromStr for PlatformKind {
    type Err = PkiError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "untrusted" => Ok(PlatformKind::Untrusted),
            "tdx" => Ok(PlatformKind::Tdx),
            "sevsnp" | "sev-snp" | "sev_snp" | "snp" => Ok(PlatformKind::SevSnp),
            "sgx" => Ok(PlatformKind::Sgx),
            _ => Err(PkiError::UnsupportedPlatform(format!(
                "'{}' (supported: untrusted, tdx, sev-snp, sgx)",
                s
            ))),
        }
    }
}
