pub mod account;
pub mod acme;
pub mod authority;
pub mod certificate;
pub mod challenge;
pub mod configuration;
pub mod directory;
pub mod error;
pub mod key_store;
pub mod manager;
pub mod models;
pub mod server;

#[cfg(test)]
mod mocks;

pub use account::{Account, AccountResolver};
pub use certificate::{CertificateConfig, CertificateIssuer};
pub use error::LifecycleError;
pub use manager::LifecycleManager;
