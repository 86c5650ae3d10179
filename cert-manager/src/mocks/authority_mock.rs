use std::sync::Arc;

use crate::acme::error::AcmeError;
use crate::authority::{
    AcmeAccountInterface, AcmeClientInterface, CertificateBundle, Registration,
};
use crate::challenge::ChallengeSolver;
use async_trait::async_trait;
use mockall::mock;
use openssl::pkey::{PKey, Private};

mock! {
    pub AcmeClientInterface {}
    #[async_trait]
    impl AcmeClientInterface for AcmeClientInterface {
        async fn register_or_load_account(
            &self,
            email: &str,
            key: &PKey<Private>,
        ) -> Result<Arc<dyn AcmeAccountInterface>, AcmeError>;
    }
}

mock! {
    pub AcmeAccountInterface {}
    #[async_trait]
    impl AcmeAccountInterface for AcmeAccountInterface {
        fn registration(&self) -> Registration;
        fn set_challenge_provider(&self, solver: Arc<dyn ChallengeSolver>) -> Result<(), AcmeError>;
        async fn obtain_certificate(&self, domains: &[String]) -> Result<CertificateBundle, AcmeError>;
    }
}
