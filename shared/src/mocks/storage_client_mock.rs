use crate::storage::{StorageClientError, StorageClientInterface};

use async_trait::async_trait;
use mockall::mock;

mock! {
  pub StorageClientInterface {}
  #[async_trait]
  impl StorageClientInterface for StorageClientInterface {
      async fn get_object(&self, key: String) -> Result<Option<Vec<u8>>, StorageClientError>;
      async fn put_object(&self, key: String, body: Vec<u8>) -> Result<(), StorageClientError>;
      async fn put_object_if_absent(&self, key: String, body: Vec<u8>) -> Result<(), StorageClientError>;
      async fn delete_object(&self, key: String) -> Result<(), StorageClientError>;
  }
}
