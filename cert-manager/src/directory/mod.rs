use async_trait::async_trait;
use shared::storage::StorageClientError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AccountRecord, Certificate};

pub mod memory;
pub mod object;

pub use memory::MemoryAccountDirectory;
pub use object::ObjectAccountDirectory;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("An account for {0} already exists")]
    DuplicateEmail(String),
    #[error("A certificate with id {0} already exists")]
    DuplicateCertificate(Uuid),
    #[error("Directory storage error - {0}")]
    Storage(#[from] StorageClientError),
    #[error("Directory record could not be decoded - {0:?}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Directory error - {0}")]
    General(String),
}

/// Metadata store for accounts and certificates. Lookups return `Ok(None)` when the
/// record does not exist, keeping "absent" distinct from "lookup failed".
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Exact match on email. Soft-deleted accounts are still returned.
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DirectoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, DirectoryError>;

    /// Fails with [`DirectoryError::DuplicateEmail`] when the email is already taken.
    async fn create(&self, account: &AccountRecord) -> Result<(), DirectoryError>;

    async fn create_certificate(&self, certificate: &Certificate) -> Result<(), DirectoryError>;

    async fn find_certificate(&self, id: Uuid) -> Result<Option<Certificate>, DirectoryError>;
}
