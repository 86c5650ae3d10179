use std::sync::Arc;

use openssl::error::ErrorStack;
use openssl::pkey::{PKey, Private};
use shared::storage::{StorageClientError, StorageClientInterface};
use thiserror::Error;

const CERTIFICATE_KEY_SUFFIX: &str = ".key";

#[derive(Debug, Error)]
pub enum KeyMaterialError {
    #[error("No key material stored under {0}")]
    NotFound(String),
    #[error("Key material under {key} could not be decoded - {source}")]
    Decode { key: String, source: ErrorStack },
    #[error("OpenSSL Error - {0:?}")]
    OpenSSLError(#[from] ErrorStack),
    #[error(transparent)]
    Storage(#[from] StorageClientError),
}

/// Opaque blob storage for account keys, certificate chains and certificate keys.
#[derive(Clone)]
pub struct KeyMaterialStore {
    storage: Arc<dyn StorageClientInterface>,
}

impl KeyMaterialStore {
    pub fn new(storage: Arc<dyn StorageClientInterface>) -> Self {
        Self { storage }
    }

    pub fn certificate_key_ref(certificate_ref: &str) -> String {
        format!("{certificate_ref}{CERTIFICATE_KEY_SUFFIX}")
    }

    pub async fn save(&self, key: &str, data: Vec<u8>) -> Result<(), KeyMaterialError> {
        self.storage.put_object(key.to_string(), data).await?;
        Ok(())
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>, KeyMaterialError> {
        self.storage
            .get_object(key.to_string())
            .await?
            .ok_or_else(|| KeyMaterialError::NotFound(key.to_string()))
    }

    pub async fn delete(&self, key: &str) -> Result<(), KeyMaterialError> {
        self.storage.delete_object(key.to_string()).await?;
        Ok(())
    }

    /// Stores `private_key` as PKCS#8 PEM.
    pub async fn save_private_key(
        &self,
        key: &str,
        private_key: &PKey<Private>,
    ) -> Result<(), KeyMaterialError> {
        let pem = private_key.private_key_to_pem_pkcs8()?;
        self.save(key, pem).await
    }

    pub async fn read_private_key(&self, key: &str) -> Result<PKey<Private>, KeyMaterialError> {
        let pem = self.read(key).await?;
        PKey::private_key_from_pem(&pem).map_err(|source| KeyMaterialError::Decode {
            key: key.to_string(),
            source,
        })
    }

    pub async fn save_certificate(
        &self,
        certificate_ref: &str,
        chain: Vec<u8>,
    ) -> Result<(), KeyMaterialError> {
        self.save(certificate_ref, chain).await
    }

    pub async fn save_certificate_key(
        &self,
        certificate_ref: &str,
        private_key_pem: Vec<u8>,
    ) -> Result<(), KeyMaterialError> {
        self.save(&Self::certificate_key_ref(certificate_ref), private_key_pem)
            .await
    }

    pub async fn read_certificate(&self, certificate_ref: &str) -> Result<Vec<u8>, KeyMaterialError> {
        self.read(certificate_ref).await
    }
}
