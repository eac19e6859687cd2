//! Certificate issuance orchestration.
//!
//! One issuance is a strictly ordered sequence: generate key, request
//! challenge, produce evidence, submit. Any failure ends the sequence and is
//! returned unchanged; nothing is retried and no partial bundle escapes.

use std::sync::Arc;

use ca_init_core::error::{PkiError, Result};
use ca_init_core::pki::{CertificateBundle, DomainSet};
use ca_init_core::PlatformKind;

use super::client::AttestationServiceClient;
use super::keys::KeyMaterial;
use crate::tee::EvidenceProvider;

/// Composes an evidence provider and an attestation client.
#[derive(Clone)]
pub struct CertificateIssuer {
    provider: Arc<dyn EvidenceProvider>,
    client: Arc<dyn AttestationServiceClient>,
}

impl CertificateIssuer {
    pub fn new(
        provider: Arc<dyn EvidenceProvider>,
        client: Arc<dyn AttestationServiceClient>,
    ) -> Self {
        Self { provider, client }
    }

    pub fn platform(&self) -> PlatformKind {
        self.provider.platform()
    }

    /// Issue a certificate for a single domain.
    pub async fn issue_certificate(&self, domain: &str) -> Result<CertificateBundle> {
        self.issue(&DomainSet::single(domain)?).await
    }

    /// Issue one certificate covering every domain in `domains`.
    pub async fn issue(&self, domains: &DomainSet) -> Result<CertificateBundle> {
        let platform = self.platform();
        tracing::info!(platform = %platform, domains = ?domains.as_slice(), "Issuing certificate");

        let key = KeyMaterial::generate(domains)?;

        let challenge = self.client.request_challenge(platform).await?;

        // Hardware quote generation blocks on the guest driver.
        let provider = Arc::clone(&self.provider);
        let public_key = key.public_key_der().to_vec();
        let (challenge, evidence) = tokio::task::spawn_blocking(move || {
            let evidence = provider.produce_evidence(&challenge, &public_key);
            (challenge, evidence)
        })
        .await
        .map_err(|e| PkiError::EvidenceUnavailable(format!("evidence task failed: {}", e)))?;
        let evidence = evidence?;

        let request = key.signing_request(domains.clone());
        let issued = self
            .client
            .submit_evidence(challenge, evidence, &request)
            .await?;
        if !issued.certificate_pem.contains("-----BEGIN CERTIFICATE-----") {
            return Err(PkiError::ProtocolError(
                "issued certificate is not PEM encoded".to_string(),
            ));
        }

        Ok(CertificateBundle::new(issued, key.into_private_key_pem()))
    }

    /// Issue a separate certificate per domain, concurrently.
    ///
    /// Each domain runs its own full sequence with its own key and challenge.
    pub async fn issue_each(&self, domains: &DomainSet) -> Vec<(String, Result<CertificateBundle>)> {
        let tasks = domains.as_slice().iter().map(|domain| async move {
            let result = self.issue_certificate(domain).await;
            (domain.clone(), result)
        });
        futures::future::join_all(tasks).await
    }
}

impl std::fmt::Debug for CertificateIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateIssuer")
            .field("platform", &self.platform())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tee::UntrustedProvider;
    use async_trait::async_trait;
    use ca_init_core::pki::{
        CertificateSigningRequest, Challenge, Evidence, IssuedCertificate,
    };
    use std::sync::Mutex;

    type EventLog = Arc<Mutex<Vec<String>>>;

    const LEAF: &str = "-----BEGIN CERTIFICATE-----\nLEAF\n-----END CERTIFICATE-----\n";
    const CHAIN: &str = "-----BEGIN CERTIFICATE-----\nCHAIN\n-----END CERTIFICATE-----\n";

    /// Records every call and echoes a fixed certificate.
    struct RecordingClient {
        events: EventLog,
        fail_challenge: bool,
        certificate_pem: &'static str,
        submitted: Mutex<Vec<(Vec<u8>, Evidence, CertificateSigningRequest)>>,
    }

    impl RecordingClient {
        fn new(events: EventLog) -> Self {
            Self {
                events,
                fail_challenge: false,
                certificate_pem: LEAF,
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AttestationServiceClient for RecordingClient {
        async fn request_challenge(&self, _platform: PlatformKind) -> Result<Challenge> {
            let mut events = self.events.lock().unwrap();
            events.push("challenge".to_string());
            if self.fail_challenge {
                return Err(PkiError::ServiceUnreachable("connection refused".to_string()));
            }
            Ok(Challenge::new(vec![events.len() as u8; 32]))
        }

        async fn submit_evidence(
            &self,
            challenge: Challenge,
            evidence: Evidence,
            request: &CertificateSigningRequest,
        ) -> Result<IssuedCertificate> {
            self.events.lock().unwrap().push("submit".to_string());
            self.submitted.lock().unwrap().push((
                challenge.nonce().to_vec(),
                evidence,
                request.clone(),
            ));
            Ok(IssuedCertificate {
                certificate_pem: self.certificate_pem.to_string(),
                ca_chain_pem: Some(CHAIN.to_string()),
            })
        }
    }

    /// Records calls; optionally fails like missing hardware.
    struct RecordingProvider {
        events: EventLog,
        fail: bool,
    }

    impl EvidenceProvider for RecordingProvider {
        fn platform(&self) -> PlatformKind {
            PlatformKind::Tdx
        }

        fn produce_evidence(&self, challenge: &Challenge, public_key: &[u8]) -> Result<Evidence> {
            self.events.lock().unwrap().push("evidence".to_string());
            if self.fail {
                return Err(PkiError::EvidenceUnavailable("no TDX device".to_string()));
            }
            let report_data = challenge.report_data(public_key);
            Ok(Evidence::new(PlatformKind::Tdx, report_data.as_bytes().to_vec()))
        }
    }

    fn issuer_with(
        provider_fails: bool,
        challenge_fails: bool,
    ) -> (CertificateIssuer, Arc<RecordingClient>, EventLog) {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut client = RecordingClient::new(Arc::clone(&events));
        client.fail_challenge = challenge_fails;
        let client = Arc::new(client);
        let provider = Arc::new(RecordingProvider {
            events: Arc::clone(&events),
            fail: provider_fails,
        });
        let issuer = CertificateIssuer::new(provider, client.clone());
        (issuer, client, events)
    }

    #[tokio::test]
    async fn test_steps_run_once_in_order() {
        let (issuer, _client, events) = issuer_with(false, false);

        issuer.issue_certificate("svc.example.com").await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["challenge", "evidence", "submit"]
        );
    }

    #[tokio::test]
    async fn test_bundle_echoes_issued_certificate() {
        let (issuer, _client, _events) = issuer_with(false, false);

        let bundle = issuer.issue_certificate("svc.example.com").await.unwrap();

        assert_eq!(bundle.leaf_certificate_pem, LEAF);
        assert_eq!(bundle.ca_chain_pem.as_deref(), Some(CHAIN));
        assert!(bundle.private_key_pem.contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn test_submission_carries_challenge_and_csr() {
        let (issuer, client, _events) = issuer_with(false, false);

        issuer.issue_certificate("svc.example.com").await.unwrap();

        let submitted = client.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let (nonce, evidence, request) = &submitted[0];
        assert_eq!(nonce, &vec![1u8; 32]);
        assert_eq!(evidence.platform(), PlatformKind::Tdx);
        assert_eq!(evidence.data().len(), 64);
        assert!(request.csr_pem.contains("BEGIN CERTIFICATE REQUEST"));
        assert_eq!(request.domains.as_slice(), &["svc.example.com"]);
    }

    #[tokio::test]
    async fn test_challenge_failure_short_circuits() {
        let (issuer, client, events) = issuer_with(false, true);

        let err = issuer.issue_certificate("svc.example.com").await.unwrap_err();

        assert!(matches!(err, PkiError::ServiceUnreachable(_)));
        assert_eq!(*events.lock().unwrap(), vec!["challenge"]);
        assert!(client.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evidence_failure_skips_submission() {
        let (issuer, client, events) = issuer_with(true, false);

        let err = issuer.issue_certificate("svc.example.com").await.unwrap_err();

        assert!(matches!(err, PkiError::EvidenceUnavailable(_)));
        assert_eq!(*events.lock().unwrap(), vec!["challenge", "evidence"]);
        assert!(client.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_run_uses_a_new_private_key() {
        let (issuer, _client, _events) = issuer_with(false, false);

        let first = issuer.issue_certificate("svc.example.com").await.unwrap();
        let second = issuer.issue_certificate("svc.example.com").await.unwrap();

        assert_ne!(first.private_key_pem, second.private_key_pem);
    }

    #[tokio::test]
    async fn test_evidence_binds_fresh_key_per_run() {
        let (issuer, client, _events) = issuer_with(false, false);

        issuer.issue_certificate("svc.example.com").await.unwrap();
        issuer.issue_certificate("svc.example.com").await.unwrap();

        let submitted = client.submitted.lock().unwrap();
        assert_ne!(submitted[0].1, submitted[1].1);
    }

    #[tokio::test]
    async fn test_multi_domain_request_keeps_set() {
        let (issuer, client, _events) = issuer_with(false, false);
        let domains = DomainSet::new(["a.example", "b.example"]).unwrap();

        issuer.issue(&domains).await.unwrap();

        let submitted = client.submitted.lock().unwrap();
        assert_eq!(submitted[0].2.domains.as_slice(), &["a.example", "b.example"]);
    }

    #[tokio::test]
    async fn test_issue_each_runs_independent_sequences() {
        let (issuer, client, events) = issuer_with(false, false);
        let domains = DomainSet::new(["a.example", "b.example"]).unwrap();

        let results = issuer.issue_each(&domains).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a.example");
        assert_eq!(results[1].0, "b.example");
        assert!(results.iter().all(|(_, r)| r.is_ok()));

        let events = events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| *e == "challenge").count(), 2);
        assert_eq!(events.iter().filter(|e| *e == "submit").count(), 2);
        assert_eq!(client.submitted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_untrusted_placeholder_reaches_ca() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(RecordingClient::new(events));
        let issuer = CertificateIssuer::new(Arc::new(UntrustedProvider::default()), client.clone());

        issuer.issue_certificate("svc.example.com").await.unwrap();

        let submitted = client.submitted.lock().unwrap();
        assert_eq!(hex::encode(submitted[0].1.data()), "cccccc");
        assert_eq!(submitted[0].1.platform(), PlatformKind::Untrusted);
    }

    #[tokio::test]
    async fn test_non_pem_certificate_is_protocol_error() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut client = RecordingClient::new(Arc::clone(&events));
        client.certificate_pem = "not a certificate";
        let issuer = CertificateIssuer::new(
            Arc::new(UntrustedProvider::default()),
            Arc::new(client),
        );

        let err = issuer.issue_certificate("svc.example.com").await.unwrap_err();

        assert!(matches!(err, PkiError::ProtocolError(_)));
    }

    #[tokio::test]
    async fn test_empty_domain_fails_before_network() {
        let (issuer, _client, events) = issuer_with(false, false);

        let err = issuer.issue_certificate("").await.unwrap_err();

        assert!(matches!(err, PkiError::Config(_)));
        assert!(events.lock().unwrap().is_empty());
    }
}
