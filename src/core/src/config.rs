use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PkiError, Result};
use crate::pki::DomainSet;
use crate::platform::PlatformKind;

/// API path appended to the CA base URL in `ApiPath::Pki` mode.
pub const PKI_API_PATH: &str = "/api/v1/pki";

/// Placeholder evidence the CA accepts as "no hardware guarantee".
pub const DEFAULT_UNTRUSTED_PLACEHOLDER: &str = "cccccc";

/// Issuer configuration, built once at the entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Platform whose evidence is presented
    pub platform: PlatformKind,

    /// CA base URL
    pub ca_base_url: String,

    /// How the attestation endpoint is derived from the base URL
    #[serde(default)]
    pub api_path: ApiPath,

    /// PEM trust bundle for the TLS connection to the CA
    pub ca_bundle_path: PathBuf,

    /// Requested domains; the first one names the output files
    pub domains: Vec<String>,

    /// Directory receiving the certificate and key files
    pub output_dir: PathBuf,

    /// Mapping from bundle fields to output files
    pub output_layout: OutputLayout,

    /// Network timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Hex-encoded placeholder evidence for the untrusted platform
    #[serde(default = "default_placeholder")]
    pub untrusted_placeholder: String,
}

fn default_placeholder() -> String {
    DEFAULT_UNTRUSTED_PLACEHOLDER.to_string()
}

impl IssuerConfig {
    /// Config with defaults for everything but the required inputs.
    pub fn new(
        platform: PlatformKind,
        ca_base_url: impl Into<String>,
        ca_bundle_path: impl Into<PathBuf>,
        domain: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            ca_base_url: ca_base_url.into(),
            api_path: ApiPath::default(),
            ca_bundle_path: ca_bundle_path.into(),
            domains: vec![domain.into()],
            output_dir: output_dir.into(),
            output_layout: OutputLayout::for_platform(platform),
            timeouts: TimeoutConfig::default(),
            untrusted_placeholder: default_placeholder(),
        }
    }

    /// Check the configuration without touching the network or disk.
    pub fn validate(&self) -> Result<()> {
        let url = self.ca_base_url.trim();
        if !url.starts_with("https://") {
            return Err(PkiError::Config(format!(
                "CA URL must use https: '{}'",
                self.ca_base_url
            )));
        }
        if self.timeouts.request_secs == 0 {
            return Err(PkiError::Config("request timeout must be non-zero".to_string()));
        }
        if self.timeouts.connect_secs == 0 {
            return Err(PkiError::Config("connect timeout must be non-zero".to_string()));
        }
        let domains = self.domain_set()?;
        validate_file_stem(domains.primary())?;
        self.placeholder_bytes()?;
        Ok(())
    }

    /// Attestation endpoint URL (no trailing slash).
    pub fn api_url(&self) -> String {
        let base = self.ca_base_url.trim().trim_end_matches('/');
        match self.api_path {
            ApiPath::Pki => format!("{}{}", base, PKI_API_PATH),
            ApiPath::Raw => base.to_string(),
        }
    }

    pub fn domain_set(&self) -> Result<DomainSet> {
        DomainSet::new(self.domains.iter().cloned())
    }

    pub fn placeholder_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(self.untrusted_placeholder.trim()).map_err(|e| {
            PkiError::Config(format!(
                "invalid untrusted placeholder '{}': {}",
                self.untrusted_placeholder, e
            ))
        })
    }
}

/// Check that `domain` can name files inside the output directory.
pub fn validate_file_stem(domain: &str) -> Result<()> {
    if domain.is_empty()
        || domain.contains('/')
        || domain.contains('\\')
        || domain.contains('\0')
        || domain.contains("..")
    {
        return Err(PkiError::Config(format!(
            "domain '{}' cannot be used as a file name",
            domain
        )));
    }
    Ok(())
}

/// Endpoint derivation from the CA base URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiPath {
    /// Append `/api/v1/pki`
    #[default]
    Pki,
    /// Use the base URL as given
    Raw,
}

impl std::str::FromStr for ApiPath {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pki" => Ok(Self::Pki),
            "raw" => Ok(Self::Raw),
            _ => Err(format!("unknown API path mode: '{}' (supported: pki, raw)", s)),
        }
    }
}

/// Which bundle field lands in which output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// `.crt` = leaf, `.ca.crt` = CA chain, `.key` = private key
    Standard,
    /// `.crt` = CA chain, no `.ca.crt`, `.key` = private key (SGX-only mode)
    ChainAsCertificate,
}

impl OutputLayout {
    /// Layout used when none is configured explicitly.
    pub fn for_platform(platform: PlatformKind) -> Self {
        match platform {
            PlatformKind::Sgx => OutputLayout::ChainAsCertificate,
            PlatformKind::Untrusted | PlatformKind::Tdx | PlatformKind::SevSnp => {
                OutputLayout::Standard
            }
        }
    }
}

impl std::fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::ChainAsCertificate => write!(f, "chain-as-certificate"),
        }
    }
}

impl std::str::FromStr for OutputLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "chain-as-certificate" => Ok(Self::ChainAsCertificate),
            _ => Err(format!(
                "unknown output layout: '{}' (supported: standard, chain-as-certificate)",
                s
            )),
        }
    }
}

/// Network timeouts for calls to the CA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds
    pub request_secs: u64,

    /// Connection establishment timeout in seconds
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("unknown log level: '{}'", s)),
        }
    }
}
