//! One issuance run: read the trust bundle, obtain a certificate, write it out.

use std::path::PathBuf;
use std::sync::Arc;

use ca_init_core::config::IssuerConfig;
use ca_init_core::error::{PkiError, Result};
use ca_init_runtime::{
    select_evidence_provider, CertificateIssuer, CertificateWriter, HttpAttestationClient,
    OutputPaths,
};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub domain: String,
    pub output_dir: PathBuf,
    pub paths: OutputPaths,
}

impl IssueOutcome {
    /// Operator-facing success line.
    pub fn message(&self) -> String {
        format!(
            "Certificate for {} stored to {}",
            self.domain,
            self.output_dir.display()
        )
    }
}

/// Run a full issuance against the CA named in `config`.
///
/// Local inputs (trust bundle, output directory) are checked before any
/// network traffic.
pub async fn issue(config: &IssuerConfig) -> Result<IssueOutcome> {
    config.validate()?;

    let ca_bundle_pem = tokio::fs::read_to_string(&config.ca_bundle_path)
        .await
        .map_err(|e| PkiError::fs(&config.ca_bundle_path, e))?;
    ensure_output_dir(config)?;

    let provider = select_evidence_provider(config.platform, config.placeholder_bytes()?);
    let client = HttpAttestationClient::from_config(config, &ca_bundle_pem)?;
    tracing::debug!(endpoint = client.endpoint(), "Using attestation endpoint");

    let issuer = CertificateIssuer::new(Arc::from(provider), Arc::new(client));
    issue_with(&issuer, config).await
}

/// Issue through `issuer` and write the bundle as `config` describes.
///
/// The configuration is validated before the CA is contacted.
pub async fn issue_with(issuer: &CertificateIssuer, config: &IssuerConfig) -> Result<IssueOutcome> {
    config.validate()?;
    let domains = config.domain_set()?;
    let bundle = issuer.issue(&domains).await?;

    let writer = CertificateWriter::new(&config.output_dir, config.output_layout);
    let paths = writer.write(domains.primary(), &bundle)?;

    Ok(IssueOutcome {
        domain: domains.primary().to_string(),
        output_dir: config.output_dir.clone(),
        paths,
    })
}

fn ensure_output_dir(config: &IssuerConfig) -> Result<()> {
    let meta = std::fs::metadata(&config.output_dir)
        .map_err(|e| PkiError::fs(&config.output_dir, e))?;
    if !meta.is_dir() {
        return Err(PkiError::fs(
            &config.output_dir,
            std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        ));
    }
    Ok(())
}
