use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openssl::pkey::{PKey, Private};

use crate::acme::account::{register, AcmeAccount};
use crate::acme::directory::Directory;
use crate::acme::error::AcmeError;
use crate::acme::transport::HttpTransport;
use crate::authority::{AcmeAccountInterface, AcmeClientInterface};

pub const LETS_ENCRYPT_DIRECTORY: &str = "https://acme-v02.api.letsencrypt.org/directory";
pub const LETS_ENCRYPT_STAGING_DIRECTORY: &str =
    "https://acme-staging-v02.api.letsencrypt.org/directory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub attempts: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            attempts: 12,
        }
    }
}

/// Talks to one ACME directory and hands out per-account clients.
#[derive(Clone)]
pub struct AcmeClient {
    directory: Arc<Directory>,
    poll: PollSettings,
}

impl AcmeClient {
    pub async fn connect(
        directory_url: &str,
        transport: Arc<dyn HttpTransport>,
        poll: PollSettings,
    ) -> Result<Self, AcmeError> {
        log::info!("Fetching ACME directory from {directory_url}");
        let directory = Directory::fetch_directory(directory_url, transport).await?;
        Ok(Self::from_directory(directory, poll))
    }

    pub fn from_directory(directory: Arc<Directory>, poll: PollSettings) -> Self {
        Self { directory, poll }
    }
}

#[async_trait]
impl AcmeClientInterface for AcmeClient {
    async fn register_or_load_account(
        &self,
        email: &str,
        key: &PKey<Private>,
    ) -> Result<Arc<dyn AcmeAccountInterface>, AcmeError> {
        let registration = register(&self.directory, email, key).await?;
        log::debug!("Account for {email} registered at {}", registration.uri);
        Ok(Arc::new(AcmeAccount::new(
            self.directory.clone(),
            key.clone(),
            registration,
            self.poll,
        )))
    }
}
