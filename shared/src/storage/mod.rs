pub mod memory;
pub mod s3;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageClientError {
    #[error("GetObject Error: {0}")]
    GetObject(String),
    #[error("PutObject Error: {0}")]
    PutObject(String),
    #[error("Object {0} already exists")]
    AlreadyExists(String),
    #[error("DeleteObject Error: {0}")]
    DeleteObject(String),
    #[error("Storage Client Error - {0}")]
    General(String),
}

// Objects are addressed by the owning entity's identifier, never by content hash.
#[async_trait]
pub trait StorageClientInterface: Send + Sync {
    async fn get_object(&self, key: String) -> Result<Option<Vec<u8>>, StorageClientError>;
    async fn put_object(&self, key: String, body: Vec<u8>) -> Result<(), StorageClientError>;
    /// Writes only when nothing is stored under `key`, atomically with respect to other
    /// writers. Fails with [`StorageClientError::AlreadyExists`] otherwise.
    async fn put_object_if_absent(
        &self,
        key: String,
        body: Vec<u8>,
    ) -> Result<(), StorageClientError>;
    async fn delete_object(&self, key: String) -> Result<(), StorageClientError>;
}
