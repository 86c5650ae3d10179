use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{StorageClientError, StorageClientInterface};

/// Process-local object store. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageClient {
    objects: Arc<DashMap<String, Vec<u8>>>,
    puts: Arc<AtomicUsize>,
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put_object` calls since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl StorageClientInterface for MemoryStorageClient {
    async fn get_object(&self, key: String) -> Result<Option<Vec<u8>>, StorageClientError> {
        Ok(self.objects.get(&key).map(|object| object.value().clone()))
    }

    async fn put_object(&self, key: String, body: Vec<u8>) -> Result<(), StorageClientError> {
        self.objects.insert(key, body);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put_object_if_absent(
        &self,
        key: String,
        body: Vec<u8>,
    ) -> Result<(), StorageClientError> {
        match self.objects.entry(key) {
            Entry::Occupied(entry) => Err(StorageClientError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(body);
                self.puts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn delete_object(&self, key: String) -> Result<(), StorageClientError> {
        self.objects.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let client = MemoryStorageClient::new();
        client
            .put_object("key".into(), b"value".to_vec())
            .await
            .unwrap();

        let object = client.get_object("key".into()).await.unwrap();
        assert_eq!(object, Some(b"value".to_vec()));
        assert_eq!(client.put_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_object_is_none() {
        let client = MemoryStorageClient::new();
        assert!(client.get_object("missing".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_if_absent_keeps_first_writer() {
        let client = MemoryStorageClient::new();
        client
            .put_object_if_absent("index".into(), b"first".to_vec())
            .await
            .unwrap();

        let result = client
            .put_object_if_absent("index".into(), b"second".to_vec())
            .await;

        assert!(matches!(result, Err(StorageClientError::AlreadyExists(key)) if key == "index"));
        assert_eq!(
            client.get_object("index".into()).await.unwrap(),
            Some(b"first".to_vec())
        );
        assert_eq!(client.put_count(), 1);
    }

    #[tokio::test]
    async fn test_clone_shares_objects() {
        let client = MemoryStorageClient::new();
        let other = client.clone();
        client.put_object("a".into(), vec![1]).await.unwrap();
        assert!(other.contains("a"));

        other.delete_object("a".into()).await.unwrap();
        assert!(client.is_empty());
    }
}
