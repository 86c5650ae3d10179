use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::acme::client::{PollSettings, LETS_ENCRYPT_DIRECTORY, LETS_ENCRYPT_STAGING_DIRECTORY};

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{0} is not set in env")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(input: &str) -> Result<Environment, Self::Err> {
        match input {
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            _ => Ok(Environment::Development),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StorageBackend {
    S3,
    Memory,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigurationError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigurationError::Invalid { name, value }),
        None => Ok(default),
    }
}

pub fn get_rust_env() -> Environment {
    var("RUST_ENV")
        .and_then(|env| Environment::from_str(&env).ok())
        .unwrap_or(Environment::Development)
}

pub fn get_acme_directory_url() -> String {
    var("ACME_DIRECTORY_URL").unwrap_or_else(|| match get_rust_env() {
        Environment::Production => LETS_ENCRYPT_DIRECTORY.to_string(),
        _ => LETS_ENCRYPT_STAGING_DIRECTORY.to_string(),
    })
}

pub fn get_poll_settings() -> Result<PollSettings, ConfigurationError> {
    let defaults = PollSettings::default();
    Ok(PollSettings {
        interval: Duration::from_secs(parse_var(
            "ACME_POLL_INTERVAL_SECS",
            defaults.interval.as_secs(),
        )?),
        attempts: parse_var("ACME_POLL_ATTEMPTS", defaults.attempts)?,
    })
}

pub fn get_http_challenge_port() -> Result<u16, ConfigurationError> {
    parse_var("HTTP_CHALLENGE_PORT", 80)
}

pub fn get_api_addr() -> Result<SocketAddr, ConfigurationError> {
    let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port: u16 = parse_var("API_PORT", 8080)?;
    let addr = format!("{host}:{port}");
    addr.parse().map_err(|_| ConfigurationError::Invalid {
        name: "API_HOST",
        value: host,
    })
}

pub fn get_storage_backend() -> Result<StorageBackend, ConfigurationError> {
    match var("STORAGE_BACKEND").as_deref() {
        None | Some("s3") => Ok(StorageBackend::S3),
        Some("memory") => Ok(StorageBackend::Memory),
        Some(other) => Err(ConfigurationError::Invalid {
            name: "STORAGE_BACKEND",
            value: other.to_string(),
        }),
    }
}

pub fn get_storage_endpoint() -> Option<String> {
    var("STORAGE_ENDPOINT")
}

pub fn get_storage_access_key() -> Result<String, ConfigurationError> {
    var("STORAGE_ACCESS_KEY").ok_or(ConfigurationError::Missing("STORAGE_ACCESS_KEY"))
}

pub fn get_storage_secret_key() -> Result<String, ConfigurationError> {
    var("STORAGE_SECRET_KEY").ok_or(ConfigurationError::Missing("STORAGE_SECRET_KEY"))
}

pub fn get_storage_region() -> String {
    var("STORAGE_REGION").unwrap_or_else(|| "us-east-1".to_string())
}

pub fn get_storage_bucket() -> Result<String, ConfigurationError> {
    var("STORAGE_BUCKET").ok_or(ConfigurationError::Missing("STORAGE_BUCKET"))
}

pub fn get_directory_bucket() -> Result<String, ConfigurationError> {
    match var("DIRECTORY_BUCKET") {
        Some(bucket) => Ok(bucket),
        None => get_storage_bucket(),
    }
}

pub fn get_auth_enabled() -> bool {
    !matches!(
        var("AUTH_ENABLED").as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("false") | Some("0")
    )
}

pub fn get_auth_public_key_path() -> Result<String, ConfigurationError> {
    var("AUTH_PUBLIC_KEY_PATH").ok_or(ConfigurationError::Missing("AUTH_PUBLIC_KEY_PATH"))
}
