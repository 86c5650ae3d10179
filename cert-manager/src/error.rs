use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::acme::error::AcmeError;
use crate::directory::DirectoryError;
use crate::key_store::KeyMaterialError;

/// Which write failed after the CA had already issued a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceStage {
    PrivateKey,
    Bundle,
    Metadata,
}

impl fmt::Display for PersistenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceStage::PrivateKey => write!(f, "private key"),
            PersistenceStage::Bundle => write!(f, "certificate bundle"),
            PersistenceStage::Metadata => write!(f, "metadata"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),
    #[error("At least one domain is required")]
    NoDomains,
    #[error("Invalid domain: {0:?}")]
    InvalidDomain(String),
    #[error("An account for {email} was created concurrently and could not be resolved")]
    DuplicateAccount { email: String },
    #[error("Account {0} not found")]
    AccountNotFound(Uuid),
    #[error("Account lookup failed - {0}")]
    AccountLookupFailure(#[source] DirectoryError),
    #[error("Account could not be persisted - {0}")]
    AccountPersistenceFailure(#[source] DirectoryError),
    #[error("Key material for account {account_id} is unavailable - {source}")]
    KeyMaterialUnavailable {
        account_id: Uuid,
        source: KeyMaterialError,
    },
    #[error("Key generation failed - {0}")]
    KeyGenerationFailure(#[source] AcmeError),
    #[error("Private key for account {account_id} could not be saved - {source}")]
    KeyPersistenceFailure {
        account_id: Uuid,
        source: KeyMaterialError,
    },
    #[error("Registration with the certificate authority failed - {0}")]
    RegistrationFailure(#[source] AcmeError),
    #[error("Unsupported challenge type: {0:?}")]
    UnsupportedChallengeType(String),
    #[error("Unsupported DNS provider: {0:?}")]
    UnsupportedDnsProvider(String),
    #[error("Challenge setup failed - {0}")]
    ChallengeSetupFailure(#[source] AcmeError),
    #[error("Certificate could not be obtained - {0}")]
    ObtainFailure(#[source] AcmeError),
    #[error(
        "Certificate {certificate_id} was issued but its {stage} could not be persisted - {source}"
    )]
    PostIssuancePersistenceFailure {
        certificate_id: Uuid,
        stage: PersistenceStage,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Certificate {0} not found")]
    CertificateNotFound(Uuid),
    #[error("Certificate lookup failed - {0}")]
    CertificateLookupFailure(#[source] DirectoryError),
}

impl LifecycleError {
    /// Errors caused by the caller's input rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::InvalidEmail(_)
                | LifecycleError::NoDomains
                | LifecycleError::InvalidDomain(_)
                | LifecycleError::UnsupportedChallengeType(_)
                | LifecycleError::UnsupportedDnsProvider(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LifecycleError::AccountNotFound(_) | LifecycleError::CertificateNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(LifecycleError::NoDomains.is_client_error());
        assert!(LifecycleError::UnsupportedDnsProvider("route53".into()).is_client_error());
        assert!(!LifecycleError::ObtainFailure(AcmeError::NoNonce).is_client_error());
        assert!(LifecycleError::AccountNotFound(Uuid::nil()).is_not_found());
    }

    #[test]
    fn test_post_issuance_message_names_stage() {
        let err = LifecycleError::PostIssuancePersistenceFailure {
            certificate_id: Uuid::nil(),
            stage: PersistenceStage::Bundle,
            source: "disk full".into(),
        };

        assert!(err.to_string().contains("certificate bundle"));
    }
}
