use std::sync::Arc;

use shared::storage::StorageClientInterface;
use uuid::Uuid;

use crate::account::{Account, AccountResolver};
use crate::authority::AcmeClientInterface;
use crate::certificate::{CertificateConfig, CertificateIssuer};
use crate::challenge::ChallengeConfigurator;
use crate::directory::AccountDirectory;
use crate::error::LifecycleError;
use crate::key_store::KeyMaterialStore;
use crate::models::{AccountRecord, Certificate};

/// Entry point for account and certificate lifecycle operations.
#[derive(Clone)]
pub struct LifecycleManager {
    accounts: AccountResolver,
    certificates: CertificateIssuer,
    directory: Arc<dyn AccountDirectory>,
}

impl LifecycleManager {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        storage: Arc<dyn StorageClientInterface>,
        authority: Arc<dyn AcmeClientInterface>,
        configurator: ChallengeConfigurator,
    ) -> Self {
        let key_store = KeyMaterialStore::new(storage);
        Self {
            accounts: AccountResolver::new(directory.clone(), key_store.clone(), authority),
            certificates: CertificateIssuer::new(configurator, key_store, directory.clone()),
            directory,
        }
    }

    pub async fn new_account(&self, email: &str) -> Result<Account, LifecycleError> {
        self.accounts.get_or_create(email).await
    }

    pub async fn account(&self, id: Uuid) -> Result<Account, LifecycleError> {
        self.accounts.load(id).await
    }

    pub async fn account_record(&self, id: Uuid) -> Result<AccountRecord, LifecycleError> {
        self.accounts.find(id).await
    }

    /// Issues with the default configuration.
    pub async fn new_certificate(
        &self,
        domains: &[String],
        account: &Account,
    ) -> Result<Certificate, LifecycleError> {
        self.new_certificate_with_config(domains, account, &CertificateConfig::default())
            .await
    }

    pub async fn new_certificate_with_config(
        &self,
        domains: &[String],
        account: &Account,
        config: &CertificateConfig,
    ) -> Result<Certificate, LifecycleError> {
        self.certificates.issue(domains, account, config).await
    }

    pub async fn certificate(&self, id: Uuid) -> Result<Certificate, LifecycleError> {
        self.directory
            .find_certificate(id)
            .await
            .map_err(LifecycleError::CertificateLookupFailure)?
            .ok_or(LifecycleError::CertificateNotFound(id))
    }
}
