use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;

use crate::domain::breaker::{BreakerConfig, CircuitBreaker};
use crate::domain::error::DomainError;
use crate::domain::provider::ProviderAdapter;

use super::sandbox_provider::SandboxProvider;

/// One breaker per provider name (spec.md §4.7): a trip on `stripe_sandbox`
/// must not affect calls routed to `paypal_sandbox`. Providers and their
/// breakers are constructed once at startup and shared across every
/// request through this registry.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            breakers: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn ProviderAdapter>, breaker_config: BreakerConfig) {
        let name = provider.name().to_string();
        self.breakers.insert(name.clone(), Arc::new(CircuitBreaker::new(breaker_config)));
        self.providers.insert(name, provider);
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(name).cloned()
    }

    pub fn breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).cloned()
    }

    /// Seeds two sandbox providers (a reliable one and a flaky one) used by
    /// local development and the integration tests. A production deployment
    /// would register real provider adapters here instead.
    pub fn with_sandbox_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            Arc::new(SandboxProvider::new("sandbox_primary", 0.02, Duration::from_millis(50))),
            BreakerConfig::default(),
        );
        registry.register(
            Arc::new(SandboxProvider::new("sandbox_secondary", 0.35, Duration::from_millis(80))),
            BreakerConfig::default(),
        );
        registry
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves both halves needed to call a provider, rejecting names that
/// were never registered rather than silently falling back.
pub fn resolve(
    registry: &ProviderRegistry,
    name: &str,
) -> Result<(Arc<dyn ProviderAdapter>, Arc<CircuitBreaker>), DomainError> {
    let provider = registry
        .provider(name)
        .ok_or_else(|| DomainError::ValidationError(format!("unknown provider: {name}")))?;
    let breaker = registry
        .breaker(name)
        .ok_or_else(|| DomainError::Internal(format!("provider {name} registered without a breaker")))?;
    Ok((provider, breaker))
}
