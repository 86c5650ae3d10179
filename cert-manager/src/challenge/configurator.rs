use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;

use super::dns::ManualDnsSolver;
use super::http::{ChallengeManager, HttpChallengeSolver};
use super::{ChallengeSolver, CHALLENGE_TYPE_DNS, CHALLENGE_TYPE_HTTP, MANUAL_DNS_PROVIDER};
use crate::authority::AcmeAccountInterface;
use crate::error::LifecycleError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChallengeOptions {
    /// Only read by the dns strategy. Absent means `manual`.
    pub dns_provider: Option<String>,
}

/// Builds a fresh solver for one issuance attempt.
pub trait ChallengeStrategy: Send + Sync {
    fn solver(&self, options: &ChallengeOptions) -> Result<Arc<dyn ChallengeSolver>, LifecycleError>;
}

pub struct HttpChallengeStrategy {
    manager: ChallengeManager,
}

impl HttpChallengeStrategy {
    pub fn new(manager: ChallengeManager) -> Self {
        Self { manager }
    }
}

impl ChallengeStrategy for HttpChallengeStrategy {
    fn solver(&self, _: &ChallengeOptions) -> Result<Arc<dyn ChallengeSolver>, LifecycleError> {
        Ok(Arc::new(HttpChallengeSolver::new(self.manager.clone())))
    }
}

type DnsProviderFactory = Box<dyn Fn() -> Arc<dyn ChallengeSolver> + Send + Sync>;

/// DNS-01 strategy dispatching on the provider name.
pub struct DnsChallengeStrategy {
    providers: HashMap<String, DnsProviderFactory>,
}

impl Default for DnsChallengeStrategy {
    fn default() -> Self {
        let prompt = Arc::new(Mutex::new(()));
        let mut strategy = Self {
            providers: HashMap::new(),
        };
        strategy.register_provider(MANUAL_DNS_PROVIDER, move || -> Arc<dyn ChallengeSolver> {
            Arc::new(ManualDnsSolver::new(prompt.clone()))
        });
        strategy
    }
}

impl DnsChallengeStrategy {
    pub fn register_provider<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn ChallengeSolver> + Send + Sync + 'static,
    {
        self.providers.insert(name.to_string(), Box::new(factory));
        self
    }
}

impl ChallengeStrategy for DnsChallengeStrategy {
    fn solver(&self, options: &ChallengeOptions) -> Result<Arc<dyn ChallengeSolver>, LifecycleError> {
        let provider = options
            .dns_provider
            .as_deref()
            .unwrap_or(MANUAL_DNS_PROVIDER);
        let factory = self
            .providers
            .get(provider)
            .ok_or_else(|| LifecycleError::UnsupportedDnsProvider(provider.to_string()))?;
        Ok(factory())
    }
}

/// Maps challenge type tags to strategies and installs the chosen solver on an
/// account client. New challenge types are added with [`ChallengeConfigurator::register`].
#[derive(Clone, Default)]
pub struct ChallengeConfigurator {
    strategies: HashMap<String, Arc<dyn ChallengeStrategy>>,
}

impl ChallengeConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `http` served through `manager`, and `dns` with the manual provider.
    pub fn with_defaults(manager: ChallengeManager) -> Self {
        let mut configurator = Self::new();
        configurator
            .register(CHALLENGE_TYPE_HTTP, HttpChallengeStrategy::new(manager))
            .register(CHALLENGE_TYPE_DNS, DnsChallengeStrategy::default());
        configurator
    }

    pub fn register<S>(&mut self, challenge_type: &str, strategy: S) -> &mut Self
    where
        S: ChallengeStrategy + 'static,
    {
        self.strategies
            .insert(challenge_type.to_string(), Arc::new(strategy));
        self
    }

    pub fn supported_challenge_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.strategies.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn configure(
        &self,
        client: &dyn AcmeAccountInterface,
        challenge_type: &str,
        options: &ChallengeOptions,
    ) -> Result<(), LifecycleError> {
        let strategy = self
            .strategies
            .get(challenge_type)
            .ok_or_else(|| LifecycleError::UnsupportedChallengeType(challenge_type.to_string()))?;

        let solver = strategy.solver(options)?;
        log::debug!(
            "Configuring {challenge_type} challenge ({})",
            solver.challenge_kind()
        );
        client
            .set_challenge_provider(solver)
            .map_err(LifecycleError::ChallengeSetupFailure)
    }
}
