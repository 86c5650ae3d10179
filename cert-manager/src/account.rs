use std::fmt;
use std::sync::Arc;

use openssl::pkey::{PKey, Private};
use uuid::Uuid;

use crate::acme::helpers::gen_rsa_private_key;
use crate::authority::{AcmeAccountInterface, AcmeClientInterface, Registration};
use crate::directory::{AccountDirectory, DirectoryError};
use crate::error::LifecycleError;
use crate::key_store::KeyMaterialStore;
use crate::models::{is_valid_email, AccountRecord};

/// A loaded account: persisted record, decoded key, and a CA client bound to that key.
#[derive(Clone)]
pub struct Account {
    pub record: AccountRecord,
    pub private_key: PKey<Private>,
    pub client: Arc<dyn AcmeAccountInterface>,
    /// Set when this call created the account rather than loading an existing one.
    pub created: bool,
}

impl Account {
    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn email(&self) -> &str {
        &self.record.email
    }

    pub fn registration(&self) -> Registration {
        self.client.registration()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("record", &self.record)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

/// Resolves an email to exactly one account, creating it on first use.
#[derive(Clone)]
pub struct AccountResolver {
    directory: Arc<dyn AccountDirectory>,
    key_store: KeyMaterialStore,
    authority: Arc<dyn AcmeClientInterface>,
}

impl AccountResolver {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        key_store: KeyMaterialStore,
        authority: Arc<dyn AcmeClientInterface>,
    ) -> Self {
        Self {
            directory,
            key_store,
            authority,
        }
    }

    /// Returns the account for `email`, creating and registering one when none exists.
    /// Losing a creation race to another caller resolves to the winner's account.
    pub async fn get_or_create(&self, email: &str) -> Result<Account, LifecycleError> {
        if !is_valid_email(email) {
            return Err(LifecycleError::InvalidEmail(email.to_string()));
        }

        log::info!("Checking if an account exists for {email}");
        if let Some(record) = self.lookup(email).await? {
            return self.load_record(record).await;
        }

        log::info!("No account found for {email}, creating one");
        match self.create(email).await {
            Err(LifecycleError::DuplicateAccount { .. }) => {
                log::warn!("Account for {email} was created concurrently, loading it");
                match self.lookup(email).await? {
                    Some(record) => self.load_record(record).await,
                    None => Err(LifecycleError::DuplicateAccount {
                        email: email.to_string(),
                    }),
                }
            }
            result => result,
        }
    }

    /// Loads a persisted account by id. Soft-deleted accounts still load.
    pub async fn load(&self, id: Uuid) -> Result<Account, LifecycleError> {
        let record = self.find(id).await?;
        self.load_record(record).await
    }

    /// Record only, without touching key material or the CA.
    pub async fn find(&self, id: Uuid) -> Result<AccountRecord, LifecycleError> {
        self.directory
            .find_by_id(id)
            .await
            .map_err(LifecycleError::AccountLookupFailure)?
            .ok_or(LifecycleError::AccountNotFound(id))
    }

    async fn lookup(&self, email: &str) -> Result<Option<AccountRecord>, LifecycleError> {
        self.directory
            .find_by_email(email)
            .await
            .map_err(LifecycleError::AccountLookupFailure)
    }

    async fn load_record(&self, record: AccountRecord) -> Result<Account, LifecycleError> {
        let private_key = self
            .key_store
            .read_private_key(&record.private_key_ref)
            .await
            .map_err(|source| LifecycleError::KeyMaterialUnavailable {
                account_id: record.id,
                source,
            })?;
        self.register(record, private_key, false).await
    }

    /// Key first, metadata second: a record never points at a key that was not stored.
    async fn create(&self, email: &str) -> Result<Account, LifecycleError> {
        let record = AccountRecord::new(email.to_string());

        log::info!("Creating private key for account {}", record.id);
        let private_key = gen_rsa_private_key().map_err(LifecycleError::KeyGenerationFailure)?;
        self.key_store
            .save_private_key(&record.private_key_ref, &private_key)
            .await
            .map_err(|source| LifecycleError::KeyPersistenceFailure {
                account_id: record.id,
                source,
            })?;

        if let Err(err) = self.directory.create(&record).await {
            return Err(match err {
                DirectoryError::DuplicateEmail(_) => {
                    self.discard_key(&record).await;
                    LifecycleError::DuplicateAccount {
                        email: email.to_string(),
                    }
                }
                // The write may have landed, so the key stays.
                other => LifecycleError::AccountPersistenceFailure(other),
            });
        }

        log::info!("Created account {} for {email}", record.id);
        self.register(record, private_key, true).await
    }

    async fn discard_key(&self, record: &AccountRecord) {
        if let Err(err) = self.key_store.delete(&record.private_key_ref).await {
            log::warn!(
                "Failed to delete orphaned key {} for {}: {err}",
                record.private_key_ref,
                record.email
            );
        }
    }

    async fn register(
        &self,
        record: AccountRecord,
        private_key: PKey<Private>,
        created: bool,
    ) -> Result<Account, LifecycleError> {
        let client = self
            .authority
            .register_or_load_account(&record.email, &private_key)
            .await
            .map_err(LifecycleError::RegistrationFailure)?;

        Ok(Account {
            record,
            private_key,
            client,
            created,
        })
    }
}
