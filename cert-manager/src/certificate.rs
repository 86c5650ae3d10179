use std::sync::Arc;

use chrono::{DateTime, Utc};
use openssl::x509::X509;
use serde::Deserialize;

use crate::account::Account;
use crate::acme::helpers::asn1_time_to_system_time;
use crate::authority::CertificateBundle;
use crate::challenge::{ChallengeConfigurator, ChallengeOptions, CHALLENGE_TYPE_HTTP};
use crate::directory::AccountDirectory;
use crate::error::{LifecycleError, PersistenceStage};
use crate::key_store::KeyMaterialStore;
use crate::models::{is_valid_domain, Certificate};

/// Per-request issuance options. Everything left out falls back to the defaults:
/// `http` challenge, `manual` DNS provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CertificateConfig {
    pub challenge_type: Option<String>,
    pub dns_provider: Option<String>,
}

impl CertificateConfig {
    pub fn challenge_type(&self) -> &str {
        self.challenge_type.as_deref().unwrap_or(CHALLENGE_TYPE_HTTP)
    }

    pub fn challenge_options(&self) -> ChallengeOptions {
        ChallengeOptions {
            dns_provider: self.dns_provider.clone(),
        }
    }
}

pub fn validate_domains(domains: &[String]) -> Result<(), LifecycleError> {
    if domains.is_empty() {
        return Err(LifecycleError::NoDomains);
    }
    match domains.iter().find(|domain| !is_valid_domain(domain)) {
        Some(invalid) => Err(LifecycleError::InvalidDomain(invalid.clone())),
        None => Ok(()),
    }
}

/// notAfter of the leaf certificate, if the chain parses.
fn leaf_expiry(chain: &[u8]) -> Option<DateTime<Utc>> {
    let leaf = X509::stack_from_pem(chain).ok()?.into_iter().next()?;
    asn1_time_to_system_time(leaf.not_after())
        .ok()
        .map(DateTime::<Utc>::from)
}

#[derive(Clone)]
pub struct CertificateIssuer {
    configurator: ChallengeConfigurator,
    key_store: KeyMaterialStore,
    directory: Arc<dyn AccountDirectory>,
}

impl CertificateIssuer {
    pub fn new(
        configurator: ChallengeConfigurator,
        key_store: KeyMaterialStore,
        directory: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            configurator,
            key_store,
            directory,
        }
    }

    /// Configures the challenge on the account's client, obtains a certificate for
    /// `domains`, and persists it. Nothing is written unless the CA issued.
    pub async fn issue(
        &self,
        domains: &[String],
        account: &Account,
        config: &CertificateConfig,
    ) -> Result<Certificate, LifecycleError> {
        validate_domains(domains)?;

        let challenge_type = config.challenge_type();
        let mut certificate =
            Certificate::new(account.id(), domains.to_vec(), challenge_type.to_string());

        log::info!(
            "Issuing certificate {} for {:?} on account {} using the {challenge_type} challenge",
            certificate.id,
            domains,
            account.id()
        );
        self.configurator.configure(
            account.client.as_ref(),
            challenge_type,
            &config.challenge_options(),
        )?;

        let bundle = account
            .client
            .obtain_certificate(domains)
            .await
            .map_err(LifecycleError::ObtainFailure)?;

        self.persist(&mut certificate, bundle).await?;
        log::info!("Certificate {} issued", certificate.id);
        Ok(certificate)
    }

    async fn persist(
        &self,
        certificate: &mut Certificate,
        bundle: CertificateBundle,
    ) -> Result<(), LifecycleError> {
        let certificate_ref = certificate.id.to_string();

        if !bundle.private_key.is_empty() {
            self.key_store
                .save_certificate_key(&certificate_ref, bundle.private_key)
                .await
                .map_err(|err| post_issuance_failure(certificate, PersistenceStage::PrivateKey, err))?;
        }

        let expires_at = leaf_expiry(&bundle.certificate);
        if expires_at.is_none() {
            log::warn!(
                "Could not read expiry of certificate {}, leaving it unset",
                certificate.id
            );
        }

        self.key_store
            .save_certificate(&certificate_ref, bundle.certificate)
            .await
            .map_err(|err| post_issuance_failure(certificate, PersistenceStage::Bundle, err))?;

        certificate.mark_issued(certificate_ref, expires_at);

        self.directory
            .create_certificate(certificate)
            .await
            .map_err(|err| post_issuance_failure(certificate, PersistenceStage::Metadata, err))
    }
}

fn post_issuance_failure<E>(
    certificate: &Certificate,
    stage: PersistenceStage,
    err: E,
) -> LifecycleError
where
    E: std::error::Error + Send + Sync + 'static,
{
    log::error!(
        "Certificate {} for {:?} (account {}) was issued by the CA but its {stage} could not be persisted: {err}",
        certificate.id,
        certificate.domains,
        certificate.account_id
    );
    LifecycleError::PostIssuancePersistenceFailure {
        certificate_id: certificate.id,
        stage,
        source: Box::new(err),
    }
}
