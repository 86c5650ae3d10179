use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use openssl::pkey::{PKey, Private};
use serde::Deserialize;
use serde_json::json;

use crate::acme::client::PollSettings;
use crate::acme::directory::Directory;
use crate::acme::error::*;
use crate::acme::helpers::gen_rsa_private_key;
use crate::authority::{AcmeAccountInterface, CertificateBundle, Registration};
use crate::challenge::ChallengeSolver;

#[derive(Deserialize, Eq, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub enum AccountStatus {
    Valid,
    Deactivated,
    Revoked,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct AccountResource {
    status: AccountStatus,
    contact: Option<Vec<String>>,
}

/// Registers `key` via newAccount. The CA answers with the existing account when it
/// already knows the key, so this doubles as a lookup.
pub async fn register(
    directory: &Directory,
    email: &str,
    key: &PKey<Private>,
) -> Result<Registration, AcmeError> {
    let response = directory
        .authenticated_request(
            &directory.urls.new_account_url,
            Some(json!({
                "contact": [format!("mailto:{email}")],
                "termsOfServiceAgreed": true,
            })),
            key,
            None,
        )
        .await?;

    let uri = response.location()?;
    let resource: AccountResource = response.json()?;

    if resource.status != AccountStatus::Valid {
        return Err(AcmeError::General(format!(
            "Account {uri} is {:?}",
            resource.status
        )));
    }

    Ok(Registration {
        uri,
        status: "valid".to_string(),
        contact: resource.contact.unwrap_or_default(),
    })
}

pub struct AcmeAccount {
    pub(crate) directory: Arc<Directory>,
    pub(crate) key: PKey<Private>,
    pub(crate) poll: PollSettings,
    registration: Registration,
    solver: Mutex<Option<Arc<dyn ChallengeSolver>>>,
}

impl AcmeAccount {
    pub fn new(
        directory: Arc<Directory>,
        key: PKey<Private>,
        registration: Registration,
        poll: PollSettings,
    ) -> Self {
        Self {
            directory,
            key,
            poll,
            registration,
            solver: Mutex::new(None),
        }
    }

    pub(crate) fn kid(&self) -> &str {
        &self.registration.uri
    }

    fn solver(&self) -> Result<Arc<dyn ChallengeSolver>, AcmeError> {
        let guard = self
            .solver
            .lock()
            .map_err(|err| AcmeError::General(err.to_string()))?;
        guard.clone().ok_or(AcmeError::NoChallengeProvider)
    }
}

#[async_trait]
impl AcmeAccountInterface for AcmeAccount {
    fn registration(&self) -> Registration {
        self.registration.clone()
    }

    fn set_challenge_provider(&self, solver: Arc<dyn ChallengeSolver>) -> Result<(), AcmeError> {
        let mut guard = self
            .solver
            .lock()
            .map_err(|err| AcmeError::General(err.to_string()))?;
        *guard = Some(solver);
        Ok(())
    }

    async fn obtain_certificate(&self, domains: &[String]) -> Result<CertificateBundle, AcmeError> {
        let solver = self.solver()?;

        let order = self.new_order(domains).await?;
        log::info!("Created order {} for {:?}", order.url, domains);

        for authorization_url in &order.authorization_urls {
            self.solve_authorization(authorization_url, solver.as_ref())
                .await?;
        }

        let order = self.wait_ready(order).await?;

        let certificate_key = gen_rsa_private_key()?;
        let order = self.finalize_order(&order, domains, &certificate_key).await?;
        let order = self.wait_done(order).await?;

        let certificate = self.download_certificate(&order).await?;
        log::info!("Downloaded certificate for {:?}", domains);

        Ok(CertificateBundle {
            domains: domains.to_vec(),
            certificate,
            private_key: certificate_key.private_key_to_pem_pkcs8()?,
        })
    }
}
