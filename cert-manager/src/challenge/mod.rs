use async_trait::async_trait;

use crate::acme::error::AcmeError;

pub mod configurator;
pub mod dns;
pub mod http;

pub use configurator::{ChallengeConfigurator, ChallengeOptions, ChallengeStrategy};

pub const CHALLENGE_TYPE_HTTP: &str = "http";
pub const CHALLENGE_TYPE_DNS: &str = "dns";
pub const MANUAL_DNS_PROVIDER: &str = "manual";

pub const HTTP_01: &str = "http-01";
pub const DNS_01: &str = "dns-01";

/// Publishes and withdraws the proof for one ACME challenge.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// ACME challenge type this solver answers, e.g. `http-01`.
    fn challenge_kind(&self) -> &'static str;

    async fn present(
        &self,
        domain: &str,
        token: &str,
        key_authorization: &str,
    ) -> Result<(), AcmeError>;

    async fn clean_up(
        &self,
        domain: &str,
        token: &str,
        key_authorization: &str,
    ) -> Result<(), AcmeError>;
}
