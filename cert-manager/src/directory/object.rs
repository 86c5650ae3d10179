use std::sync::Arc;

use async_trait::async_trait;
use shared::storage::{StorageClientError, StorageClientInterface};
use uuid::Uuid;

use super::{AccountDirectory, DirectoryError};
use crate::models::{AccountRecord, Certificate};

fn account_key(id: Uuid) -> String {
    format!("accounts/{id}.json")
}

fn email_index_key(email: &str) -> String {
    format!("accounts/by-email/{email}")
}

fn certificate_key(id: Uuid) -> String {
    format!("certificates/{id}.json")
}

/// Directory kept as JSON documents in an object store.
///
/// Email uniqueness relies on an index object holding the owning account id, written with a
/// conditional put. The first writer to claim the index owns the email; later writers remove
/// their record and see [`DirectoryError::DuplicateEmail`].
#[derive(Clone)]
pub struct ObjectAccountDirectory {
    storage: Arc<dyn StorageClientInterface>,
}

impl ObjectAccountDirectory {
    pub fn new(storage: Arc<dyn StorageClientInterface>) -> Self {
        Self { storage }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        key: String,
    ) -> Result<Option<T>, DirectoryError> {
        match self.storage.get_object(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn index_owner(&self, email: &str) -> Result<Option<Uuid>, DirectoryError> {
        let Some(bytes) = self.storage.get_object(email_index_key(email)).await? else {
            return Ok(None);
        };
        let id = std::str::from_utf8(&bytes)
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or_else(|| DirectoryError::General(format!("Corrupt email index for {email}")))?;
        Ok(Some(id))
    }
}

#[async_trait]
impl AccountDirectory for ObjectAccountDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DirectoryError> {
        let Some(id) = self.index_owner(email).await? else {
            return Ok(None);
        };

        match self.find_by_id(id).await? {
            Some(record) => Ok(Some(record)),
            None => Err(DirectoryError::General(format!(
                "Email index for {email} points at missing account {id}"
            ))),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, DirectoryError> {
        self.read_json(account_key(id)).await
    }

    async fn create(&self, account: &AccountRecord) -> Result<(), DirectoryError> {
        if self.index_owner(&account.email).await?.is_some() {
            return Err(DirectoryError::DuplicateEmail(account.email.clone()));
        }

        // The record lands before the index so a readable index always resolves.
        self.storage
            .put_object(account_key(account.id), serde_json::to_vec(account)?)
            .await?;

        let claimed = self
            .storage
            .put_object_if_absent(
                email_index_key(&account.email),
                account.id.to_string().into_bytes(),
            )
            .await;

        match claimed {
            Ok(()) => Ok(()),
            Err(StorageClientError::AlreadyExists(_)) => {
                log::warn!(
                    "Lost email index race for {}, discarding account {}",
                    account.email,
                    account.id
                );
                if let Err(err) = self.storage.delete_object(account_key(account.id)).await {
                    log::warn!("Failed to discard account record {}: {err}", account.id);
                }
                Err(DirectoryError::DuplicateEmail(account.email.clone()))
            }
            // The index write may have landed, so the record stays.
            Err(err) => Err(err.into()),
        }
    }

    async fn create_certificate(&self, certificate: &Certificate) -> Result<(), DirectoryError> {
        let key = certificate_key(certificate.id);
        if self.storage.get_object(key.clone()).await?.is_some() {
            return Err(DirectoryError::DuplicateCertificate(certificate.id));
        }
        self.storage
            .put_object(key, serde_json::to_vec(certificate)?)
            .await?;
        Ok(())
    }

    async fn find_certificate(&self, id: Uuid) -> Result<Option<Certificate>, DirectoryError> {
        self.read_json(certificate_key(id)).await
    }
}
