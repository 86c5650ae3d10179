use crate::directory::{AccountDirectory, DirectoryError};
use crate::models::{AccountRecord, Certificate};
use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

mock! {
    pub AccountDirectory {}
    #[async_trait]
    impl AccountDirectory for AccountDirectory {
        async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DirectoryError>;
        async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, DirectoryError>;
        async fn create(&self, account: &AccountRecord) -> Result<(), DirectoryError>;
        async fn create_certificate(&self, certificate: &Certificate) -> Result<(), DirectoryError>;
        async fn find_certificate(&self, id: Uuid) -> Result<Option<Certificate>, DirectoryError>;
    }
}
