use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::{ProvideErrorMetadata, SdkError},
    operation::{
        delete_object::DeleteObjectError, get_object::GetObjectError, put_object::PutObjectError,
    },
    primitives::ByteStream,
};
use thiserror::Error;

use super::{StorageClientError, StorageClientInterface};

#[derive(Error, Debug)]
pub enum S3ClientError {
    #[error("GetObject Error: {0}")]
    GetObject(#[from] SdkError<GetObjectError>),
    #[error("PutObject Error: {0}")]
    PutObject(#[from] SdkError<PutObjectError>),
    #[error("DeleteObject Error: {0}")]
    DeleteObject(#[from] SdkError<DeleteObjectError>),
    #[error("S3 Client Error - {0}")]
    General(String),
}

impl From<S3ClientError> for StorageClientError {
    fn from(error: S3ClientError) -> Self {
        match error {
            S3ClientError::GetObject(err) => StorageClientError::GetObject(err.to_string()),
            S3ClientError::PutObject(err) => StorageClientError::PutObject(err.to_string()),
            S3ClientError::DeleteObject(err) => StorageClientError::DeleteObject(err.to_string()),
            S3ClientError::General(err) => StorageClientError::General(err),
        }
    }
}

/// Connection parameters for an S3-compatible store reached through an explicit endpoint
/// (MinIO, Ceph, ...). The API must be served over TLS.
#[derive(Clone, Debug)]
pub struct S3EndpointConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Clone, Debug)]
pub struct S3Client {
    bucket: String,
    client: s3::Client,
}

impl S3Client {
    /// Uses the ambient AWS configuration (env vars, profile, instance role).
    pub async fn new(bucket: String) -> Self {
        let config = aws_config::load_from_env().await;
        let client = s3::Client::new(&config);
        Self { bucket, client }
    }

    pub fn with_endpoint(bucket: String, endpoint: S3EndpointConfig) -> Self {
        let credentials = Credentials::new(
            endpoint.access_key,
            endpoint.secret_key,
            None,
            None,
            "static",
        );
        let config = s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(endpoint.region))
            .endpoint_url(endpoint.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        let client = s3::Client::from_conf(config);
        Self { bucket, client }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

// 412 when the key exists, 409 when a concurrent conditional write on the key is in flight.
fn is_existing_object(err: &SdkError<PutObjectError>) -> bool {
    let code = err
        .as_service_error()
        .and_then(|service_error| service_error.code());
    matches!(
        code,
        Some("PreconditionFailed") | Some("ConditionalRequestConflict")
    )
}

#[async_trait]
impl StorageClientInterface for S3Client {
    async fn get_object(&self, key: String) -> Result<Option<Vec<u8>>, StorageClientError> {
        let object = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(object) => object,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(GetObjectError::is_no_such_key)
                    .unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                return Err(S3ClientError::GetObject(err).into());
            }
        };

        let body = object
            .body
            .collect()
            .await
            .map_err(|err| S3ClientError::General(err.to_string()))?
            .to_vec();

        Ok(Some(body))
    }

    async fn put_object(&self, key: String, body: Vec<u8>) -> Result<(), StorageClientError> {
        let _ = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(S3ClientError::PutObject)?;

        Ok(())
    }

    async fn put_object_if_absent(
        &self,
        key: String,
        body: Vec<u8>,
    ) -> Result<(), StorageClientError> {
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .if_none_match("*")
            .body(ByteStream::from(body))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_existing_object(&err) => Err(StorageClientError::AlreadyExists(key)),
            Err(err) => Err(S3ClientError::PutObject(err).into()),
        }
    }

    async fn delete_object(&self, key: String) -> Result<(), StorageClientError> {
        let _ = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(S3ClientError::DeleteObject)?;

        Ok(())
    }
}
