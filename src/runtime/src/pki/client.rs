//! Attestation service client.
//!
//! Two-step protocol against the CA's attestation endpoint:
//!
//! 1. `POST {endpoint}/challenges` with the platform type, returns a nonce.
//! 2. `POST {endpoint}/certificates` with the nonce, the evidence, the CSR
//!    and the requested domains, returns the signed certificate and chain.
//!
//! Every call is attempted exactly once; retry policy belongs to the caller.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ca_init_core::config::{IssuerConfig, TimeoutConfig};
use ca_init_core::error::{PkiError, Result};
use ca_init_core::pki::{CertificateSigningRequest, Challenge, Evidence, IssuedCertificate};
use ca_init_core::PlatformKind;
use serde::{Deserialize, Serialize};

const PEM_CERTIFICATE_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_CERTIFICATE_END: &str = "-----END CERTIFICATE-----";

/// Wire client to the CA's attestation endpoint.
#[async_trait]
pub trait AttestationServiceClient: Send + Sync {
    /// Obtain a fresh single-use challenge for `platform`.
    async fn request_challenge(&self, platform: PlatformKind) -> Result<Challenge>;

    /// Exchange a challenge, its evidence and a CSR for a signed certificate.
    async fn submit_evidence(
        &self,
        challenge: Challenge,
        evidence: Evidence,
        request: &CertificateSigningRequest,
    ) -> Result<IssuedCertificate>;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChallengeRequest<'a> {
    #[serde(rename = "type")]
    challenge_type: &'a str,
}

#[derive(Deserialize)]
struct ChallengeResponse {
    nonce: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    #[serde(rename = "type")]
    challenge_type: &'a str,
    challenge: String,
    evidence: String,
    csr_pem: &'a str,
    domains: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    certificate_pem: String,
    #[serde(default)]
    ca_bundle_pem: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// HTTPS client trusting only the supplied CA bundle.
#[derive(Debug, Clone)]
pub struct HttpAttestationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpAttestationClient {
    /// Create a client for `endpoint` trusting every certificate in `ca_bundle_pem`.
    ///
    /// The endpoint must be an `https://` URL.
    pub fn new(
        endpoint: impl Into<String>,
        ca_bundle_pem: &str,
        timeouts: &TimeoutConfig,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("https://") {
            return Err(PkiError::Config(format!(
                "attestation endpoint must use https: '{}'",
                endpoint
            )));
        }
        Self::build(endpoint, ca_bundle_pem, timeouts, true)
    }

    fn build(
        endpoint: String,
        ca_bundle_pem: &str,
        timeouts: &TimeoutConfig,
        https_only: bool,
    ) -> Result<Self> {
        let roots = split_pem_certificates(ca_bundle_pem);
        if roots.is_empty() {
            return Err(PkiError::Config(
                "CA bundle contains no PEM certificates".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .https_only(https_only)
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect());

        for (index, pem) in roots.iter().enumerate() {
            let cert = reqwest::Certificate::from_pem(pem.as_bytes()).map_err(|e| {
                PkiError::Config(format!("invalid certificate #{} in CA bundle: {}", index, e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| PkiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        tracing::debug!(endpoint = %endpoint, roots = roots.len(), "Created attestation client");

        Ok(Self { http, endpoint })
    }

    /// Create a client for the endpoint and timeouts in `config`.
    pub fn from_config(config: &IssuerConfig, ca_bundle_pem: &str) -> Result<Self> {
        Self::new(config.api_url(), ca_bundle_pem, &config.timeouts)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a JSON body, returning the status and the raw response body.
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(reqwest::StatusCode, Vec<u8>)> {
        let url = format!("{}{}", self.endpoint, path);
        tracing::debug!(url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;

        Ok((status, bytes.to_vec()))
    }
}

#[async_trait]
impl AttestationServiceClient for HttpAttestationClient {
    async fn request_challenge(&self, platform: PlatformKind) -> Result<Challenge> {
        let request = ChallengeRequest {
            challenge_type: platform.wire_name(),
        };
        let (status, body) = self.post_json("/challenges", &request).await?;

        if !status.is_success() {
            return Err(PkiError::ServiceError {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let response: ChallengeResponse = serde_json::from_slice(&body).map_err(|e| {
            PkiError::ProtocolError(format!("invalid challenge response: {}", e))
        })?;
        let nonce = BASE64.decode(response.nonce.trim()).map_err(|e| {
            PkiError::ProtocolError(format!("challenge nonce is not base64: {}", e))
        })?;
        if nonce.is_empty() {
            return Err(PkiError::ProtocolError("challenge nonce is empty".to_string()));
        }

        tracing::info!(platform = %platform, nonce_size = nonce.len(), "Received challenge");
        Ok(Challenge::new(nonce))
    }

    async fn submit_evidence(
        &self,
        challenge: Challenge,
        evidence: Evidence,
        request: &CertificateSigningRequest,
    ) -> Result<IssuedCertificate> {
        let sign_request = SignRequest {
            challenge_type: evidence.platform().wire_name(),
            challenge: BASE64.encode(challenge.nonce()),
            evidence: BASE64.encode(evidence.data()),
            csr_pem: &request.csr_pem,
            domains: request.domains.as_slice(),
        };
        let (status, body) = self.post_json("/certificates", &sign_request).await?;

        match status.as_u16() {
            401 | 403 | 422 => {
                return Err(PkiError::AttestationRejected(error_message(status, &body)));
            }
            _ if !status.is_success() => {
                return Err(PkiError::ServiceError {
                    status: status.as_u16(),
                    message: error_message(status, &body),
                });
            }
            _ => {}
        }

        let response: SignResponse = serde_json::from_slice(&body).map_err(|e| {
            PkiError::ProtocolError(format!("invalid certificate response: {}", e))
        })?;

        if !response.certificate_pem.contains(PEM_CERTIFICATE_BEGIN) {
            return Err(PkiError::ProtocolError(
                "certificate response does not contain a PEM certificate".to_string(),
            ));
        }

        let ca_chain_pem = response
            .ca_bundle_pem
            .filter(|chain| !chain.trim().is_empty());

        tracing::info!(
            domains = ?request.domains.as_slice(),
            has_chain = ca_chain_pem.is_some(),
            "CA issued certificate"
        );

        Ok(IssuedCertificate {
            certificate_pem: response.certificate_pem,
            ca_chain_pem,
        })
    }
}

/// Map a reqwest failure to `ServiceUnreachable`.
fn transport_error(url: &str, err: reqwest::Error) -> PkiError {
    if err.is_timeout() {
        PkiError::ServiceUnreachable(format!("{}: request timed out", url))
    } else {
        PkiError::ServiceUnreachable(format!("{}: {}", url, err))
    }
}

/// Best-effort human-readable message from an error response body.
fn error_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    if let Some(message) = parsed.message.or(parsed.error) {
        return message;
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        text
    }
}

/// Split a PEM bundle into individual certificate blocks.
pub fn split_pem_certificates(bundle: &str) -> Vec<String> {
    bundle
        .split_inclusive(PEM_CERTIFICATE_END)
        .filter_map(|chunk| {
            let start = chunk.find(PEM_CERTIFICATE_BEGIN)?;
            let block = &chunk[start..];
            block
                .ends_with(PEM_CERTIFICATE_END)
                .then(|| format!("{}\n", block))
        })
        .collect()
}
