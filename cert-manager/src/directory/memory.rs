use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{AccountDirectory, DirectoryError};
use crate::models::{AccountRecord, Certificate};

/// Process-local directory keyed by email. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountDirectory {
    accounts: Arc<DashMap<String, AccountRecord>>,
    certificates: Arc<DashMap<Uuid, Certificate>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn certificate_count(&self) -> usize {
        self.certificates.len()
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DirectoryError> {
        Ok(self.accounts.get(email).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, DirectoryError> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone()))
    }

    async fn create(&self, account: &AccountRecord) -> Result<(), DirectoryError> {
        match self.accounts.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(DirectoryError::DuplicateEmail(account.email.clone())),
            Entry::Vacant(entry) => {
                entry.insert(account.clone());
                Ok(())
            }
        }
    }

    async fn create_certificate(&self, certificate: &Certificate) -> Result<(), DirectoryError> {
        match self.certificates.entry(certificate.id) {
            Entry::Occupied(_) => Err(DirectoryError::DuplicateCertificate(certificate.id)),
            Entry::Vacant(entry) => {
                entry.insert(certificate.clone());
                Ok(())
            }
        }
    }

    async fn find_certificate(&self, id: Uuid) -> Result<Option<Certificate>, DirectoryError> {
        Ok(self.certificates.get(&id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let directory = MemoryAccountDirectory::new();
        let record = AccountRecord::new("ops@example.com".into());

        directory.create(&record).await.unwrap();

        assert_eq!(
            directory.find_by_email("ops@example.com").await.unwrap(),
            Some(record.clone())
        );
        assert_eq!(directory.find_by_id(record.id).await.unwrap(), Some(record));
        assert_eq!(directory.find_by_email("OPS@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let directory = MemoryAccountDirectory::new();
        directory
            .create(&AccountRecord::new("ops@example.com".into()))
            .await
            .unwrap();

        let result = directory
            .create(&AccountRecord::new("ops@example.com".into()))
            .await;

        assert!(matches!(result, Err(DirectoryError::DuplicateEmail(_))));
        assert_eq!(directory.account_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_admit_one() {
        let directory = MemoryAccountDirectory::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let directory = directory.clone();
                tokio::spawn(async move {
                    directory
                        .create(&AccountRecord::new("race@example.com".into()))
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
    }
}
