use std::net::SocketAddr;
use std::sync::Arc;

use cert_manager::acme::client::AcmeClient;
use cert_manager::acme::transport::HyperTransport;
use cert_manager::challenge::http::{run_challenge_server, ChallengeManager};
use cert_manager::challenge::ChallengeConfigurator;
use cert_manager::configuration::{self, StorageBackend};
use cert_manager::directory::{AccountDirectory, MemoryAccountDirectory, ObjectAccountDirectory};
use cert_manager::server::{self, TokenVerifier};
use cert_manager::LifecycleManager;
use shared::storage::memory::MemoryStorageClient;
use shared::storage::s3::{S3Client, S3EndpointConfig};
use shared::storage::StorageClientInterface;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn s3_client(bucket: String) -> Result<S3Client, BoxError> {
    let client = match configuration::get_storage_endpoint() {
        Some(endpoint) => S3Client::with_endpoint(
            bucket,
            S3EndpointConfig {
                endpoint,
                access_key: configuration::get_storage_access_key()?,
                secret_key: configuration::get_storage_secret_key()?,
                region: configuration::get_storage_region(),
            },
        ),
        None => S3Client::new(bucket).await,
    };
    Ok(client)
}

async fn build_stores(
) -> Result<(Arc<dyn StorageClientInterface>, Arc<dyn AccountDirectory>), BoxError> {
    match configuration::get_storage_backend()? {
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage, nothing survives a restart");
            Ok((
                Arc::new(MemoryStorageClient::new()),
                Arc::new(MemoryAccountDirectory::new()),
            ))
        }
        StorageBackend::S3 => {
            let key_material = s3_client(configuration::get_storage_bucket()?).await?;
            let records = s3_client(configuration::get_directory_bucket()?).await?;
            log::info!(
                "Key material in bucket {}, records in bucket {}",
                key_material.bucket(),
                records.bucket()
            );
            Ok((
                Arc::new(key_material),
                Arc::new(ObjectAccountDirectory::new(Arc::new(records))),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    shared::logging::init_logger();

    let (storage, directory) = build_stores().await?;

    let authority = AcmeClient::connect(
        &configuration::get_acme_directory_url(),
        Arc::new(HyperTransport::new()),
        configuration::get_poll_settings()?,
    )
    .await?;

    let challenges = ChallengeManager::new();
    let manager = LifecycleManager::new(
        directory,
        storage,
        Arc::new(authority),
        ChallengeConfigurator::with_defaults(challenges.clone()),
    );

    let verifier = if configuration::get_auth_enabled() {
        let path = configuration::get_auth_public_key_path()?;
        Some(Arc::new(TokenVerifier::from_file(path)?))
    } else {
        log::warn!("Bearer authentication is disabled");
        None
    };

    let challenge_addr = SocketAddr::from(([0, 0, 0, 0], configuration::get_http_challenge_port()?));
    let api_addr = configuration::get_api_addr()?;

    tokio::try_join!(
        run_challenge_server(challenge_addr, challenges),
        server::run_server(api_addr, server::router(manager, verifier)),
    )?;

    Ok(())
}
