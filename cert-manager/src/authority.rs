use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use openssl::pkey::{PKey, Private};

use crate::acme::error::AcmeError;
use crate::challenge::ChallengeSolver;

/// CA-side registration resource for an account key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// Account URL (`kid`) returned in the `Location` header.
    pub uri: String,
    pub status: String,
    pub contact: Vec<String>,
}

/// PEM certificate chain plus the PKCS#8 PEM key it was issued for.
#[derive(Clone)]
pub struct CertificateBundle {
    pub domains: Vec<String>,
    pub certificate: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("domains", &self.domains)
            .field("certificate_len", &self.certificate.len())
            .finish_non_exhaustive()
    }
}

/// Builds per-account ACME clients.
#[async_trait]
pub trait AcmeClientInterface: Send + Sync {
    /// Registers `key` with the CA, or fetches the existing registration when the CA
    /// already knows the key.
    async fn register_or_load_account(
        &self,
        email: &str,
        key: &PKey<Private>,
    ) -> Result<Arc<dyn AcmeAccountInterface>, AcmeError>;
}

/// A client bound to one registered account key.
#[async_trait]
pub trait AcmeAccountInterface: Send + Sync {
    fn registration(&self) -> Registration;

    /// Installs the solver used by the next issuance. Replaces any earlier solver.
    fn set_challenge_provider(&self, solver: Arc<dyn ChallengeSolver>) -> Result<(), AcmeError>;

    async fn obtain_certificate(&self, domains: &[String]) -> Result<CertificateBundle, AcmeError>;
}
