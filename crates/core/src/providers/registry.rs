use std::collections::HashMap;

use super::exchangerate_host::ExchangeRateHostProvider;
use super::frankfurter::FrankfurterProvider;
use super::traits::RateProvider;

/// Ordered list of exchange-rate sources.
///
/// Registration order is priority order: the rate service asks each provider
/// in turn and keeps the first valid answer. New providers can be added
/// without modifying existing code.
pub struct RateProviderRegistry {
    providers: Vec<Box<dyn RateProvider>>,
}

impl RateProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Frankfurter: ECB rates, no API key needed (primary)
        registry.register(Box::new(FrankfurterProvider::new()));

        // exchangerate.host: requires API key (fallback)
        if let Some(key) = api_keys.get("exchangerate_host") {
            registry.register(Box::new(ExchangeRateHostProvider::new(key.clone())));
        }

        registry
    }

    /// Register a new rate provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn RateProvider>) {
        self.providers.push(provider);
    }

    /// All providers, in priority order.
    pub fn providers(&self) -> impl Iterator<Item = &dyn RateProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for RateProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
