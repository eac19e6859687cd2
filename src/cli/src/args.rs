//! Command line arguments and their translation into an [`IssuerConfig`].

use std::path::PathBuf;

use ca_init_core::config::{ApiPath, IssuerConfig, LogLevel, OutputLayout, TimeoutConfig};
use ca_init_core::error::{PkiError, Result};
use ca_init_core::PlatformKind;
use clap::Parser;

/// Platform argument value that detects the host platform instead of naming a platform.
pub const AUTO_PLATFORM: &str = "auto";

/// Obtain a TLS certificate from the CA by proving the TEE this process runs in.
#[derive(Parser, Debug)]
#[command(name = "ca-initializer", version, about)]
pub struct Cli {
    /// Platform: untrusted, tdx, sevsnp, sgx, or auto to detect the host
    pub platform: String,

    /// CA base URL
    pub ca_url: String,

    /// PEM bundle trusted for the TLS connection to the CA
    pub ca_bundle_path: PathBuf,

    /// Domain to issue the certificate for; also names the output files
    pub domain: String,

    /// Existing directory receiving <domain>.crt, <domain>.ca.crt and <domain>.key
    pub output_dir: PathBuf,

    /// Additional subject alternative name (repeatable)
    #[arg(long = "san", value_name = "DOMAIN")]
    pub sans: Vec<String>,

    /// How the attestation endpoint is derived from CA_URL (pki, raw)
    #[arg(long, default_value = "pki")]
    pub api_path: ApiPath,

    /// Output file layout (standard, chain-as-certificate); defaults per platform
    #[arg(long)]
    pub output_layout: Option<OutputLayout>,

    /// Per-request timeout for calls to the CA, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Connect timeout for calls to the CA, in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Hex-encoded evidence sent for the untrusted platform
    #[arg(long, value_name = "HEX")]
    pub untrusted_placeholder: Option<String>,

    /// Log level when RUST_LOG is not set (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

/// Resolve the platform argument, probing the host for `auto`.
pub fn resolve_platform(arg: &str) -> Result<PlatformKind> {
    if arg.eq_ignore_ascii_case(AUTO_PLATFORM) {
        let detected = ca_init_runtime::detect_platform().ok_or_else(|| {
            PkiError::UnsupportedPlatform("auto: no TEE guest interface found".to_string())
        })?;
        tracing::info!(platform = %detected, "Detected TEE platform");
        return Ok(detected);
    }
    arg.parse()
}

/// Build the issuer configuration from parsed arguments.
pub fn build_config(cli: &Cli) -> Result<IssuerConfig> {
    let platform = resolve_platform(&cli.platform)?;

    let mut config = IssuerConfig::new(
        platform,
        cli.ca_url.clone(),
        cli.ca_bundle_path.clone(),
        cli.domain.clone(),
        cli.output_dir.clone(),
    );
    config.domains.extend(cli.sans.iter().cloned());
    config.api_path = cli.api_path;
    if let Some(layout) = cli.output_layout {
        config.output_layout = layout;
    }
    config.timeouts = TimeoutConfig {
        request_secs: cli.timeout_secs,
        connect_secs: cli.connect_timeout_secs,
    };
    if let Some(placeholder) = &cli.untrusted_placeholder {
        config.untrusted_placeholder = placeholder.clone();
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ca-initializer"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    const REQUIRED: [&str; 5] = [
        "untrusted",
        "https://ca.example",
        "/etc/ca.pem",
        "svc.example.com",
        "/tmp/out",
    ];

    #[test]
    fn test_positional_arguments() {
        let cli = parse(&REQUIRED);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.platform, PlatformKind::Untrusted);
        assert_eq!(config.ca_base_url, "https://ca.example");
        assert_eq!(config.ca_bundle_path, PathBuf::from("/etc/ca.pem"));
        assert_eq!(config.domains, vec!["svc.example.com"]);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.api_path, ApiPath::Pki);
        assert_eq!(config.output_layout, OutputLayout::Standard);
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.timeouts.connect_secs, 10);
    }

    #[test]
    fn test_missing_arguments_rejected() {
        let err = Cli::try_parse_from(["ca-initializer", "untrusted", "https://ca.example"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_platform_names() {
        for (arg, expected) in [
            ("tdx", PlatformKind::Tdx),
            ("SEVSNP", PlatformKind::SevSnp),
            ("sev-snp", PlatformKind::SevSnp),
            ("sgx", PlatformKind::Sgx),
        ] {
            assert_eq!(resolve_platform(arg).unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_platform() {
        let mut args = REQUIRED;
        args[0] = "nitro";
        let err = build_config(&parse(&args)).unwrap_err();
        assert!(matches!(err, PkiError::UnsupportedPlatform(_)));
    }

    #[test]
    fn test_sgx_defaults_to_chain_as_certificate() {
        let mut args = REQUIRED;
        args[0] = "sgx";
        let config = build_config(&parse(&args)).unwrap();
        assert_eq!(config.output_layout, OutputLayout::ChainAsCertificate);
    }

    #[test]
    fn test_options_override_defaults() {
        let mut args = REQUIRED.to_vec();
        args.extend_from_slice(&[
            "--san",
            "alt.example.com",
            "--san",
            "svc.example.com",
            "--api-path",
            "raw",
            "--output-layout",
            "chain-as-certificate",
            "--timeout-secs",
            "5",
            "--connect-timeout-secs",
            "2",
            "--untrusted-placeholder",
            "dddd",
        ]);
        let config = build_config(&parse(&args)).unwrap();

        assert_eq!(
            config.domain_set().unwrap().as_slice(),
            &["svc.example.com", "alt.example.com"]
        );
        assert_eq!(config.api_url(), "https://ca.example");
        assert_eq!(config.output_layout, OutputLayout::ChainAsCertificate);
        assert_eq!(config.timeouts.request_secs, 5);
        assert_eq!(config.timeouts.connect_secs, 2);
        assert_eq!(config.placeholder_bytes().unwrap(), vec![0xdd, 0xdd]);
    }

    #[test]
    fn test_invalid_placeholder_is_config_error() {
        let mut args = REQUIRED.to_vec();
        args.extend_from_slice(&["--untrusted-placeholder", "zz"]);
        let err = build_config(&parse(&args)).unwrap_err();
        assert!(matches!(err, PkiError::Config(_)));
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let mut args = REQUIRED;
        args[1] = "ca.example";
        let err = build_config(&parse(&args)).unwrap_err();
        assert!(matches!(err, PkiError::Config(_)));
    }
}
