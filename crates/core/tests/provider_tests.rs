// ═══════════════════════════════════════════════════════════════════
// Provider Tests: registry ordering, HTTP providers offline behavior
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::collections::HashMap;

use tradeledger_core::errors::CoreError;
use tradeledger_core::providers::exchangerate_host::ExchangeRateHostProvider;
use tradeledger_core::providers::frankfurter::FrankfurterProvider;
use tradeledger_core::providers::registry::RateProviderRegistry;
use tradeledger_core::providers::traits::RateProvider;

/// Nothing listens here; requests fail fast with a connection error.
const DEAD_HOST: &str = "http://127.0.0.1:1";

struct NamedProvider(&'static str);

#[async_trait]
impl RateProvider for NamedProvider {
    fn name(&self) -> &str {
        self.0
    }

    async fn fetch_rates(
        &self,
        base: &str,
        _wanted: &[String],
    ) -> Result<HashMap<String, f64>, CoreError> {
        Ok(HashMap::from([(base.to_string(), 1.0)]))
    }
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

// ═══════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════

mod registry {
    use super::*;

    #[test]
    fn new_is_empty() {
        let registry = RateProviderRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.names().is_empty());
    }

    #[test]
    fn defaults_without_keys() {
        let registry = RateProviderRegistry::new_with_defaults(&HashMap::new());
        assert_eq!(registry.names(), vec!["Frankfurter"]);
    }

    #[test]
    fn defaults_with_exchangerate_host_key() {
        let keys = HashMap::from([("exchangerate_host".to_string(), "secret".to_string())]);
        let registry = RateProviderRegistry::new_with_defaults(&keys);
        assert_eq!(registry.names(), vec!["Frankfurter", "exchangerate.host"]);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let keys = HashMap::from([("someone_else".to_string(), "k".to_string())]);
        let registry = RateProviderRegistry::new_with_defaults(&keys);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registration_order_is_priority_order() {
        let mut registry = RateProviderRegistry::new();
        registry.register(Box::new(NamedProvider("first")));
        registry.register(Box::new(NamedProvider("second")));
        registry.register(Box::new(NamedProvider("third")));

        let names: Vec<&str> = registry.providers().map(|p| p.name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Frankfurter
// ═══════════════════════════════════════════════════════════════════

mod frankfurter {
    use super::*;

    #[test]
    fn name() {
        assert_eq!(FrankfurterProvider::new().name(), "Frankfurter");
    }

    #[tokio::test]
    async fn base_only_request_needs_no_network() {
        let provider = FrankfurterProvider::with_base_url(DEAD_HOST);
        let rates = provider
            .fetch_rates("usd", &codes(&["USD", " usd "]))
            .await
            .unwrap();
        assert_eq!(rates, HashMap::from([("USD".to_string(), 1.0)]));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let provider = FrankfurterProvider::with_base_url(DEAD_HOST);
        let result = provider.fetch_rates("USD", &codes(&["EUR"])).await;
        assert!(matches!(
            result,
            Err(CoreError::Network(_)) | Err(CoreError::Api { .. })
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// exchangerate.host
// ═══════════════════════════════════════════════════════════════════

mod exchangerate_host {
    use super::*;

    #[test]
    fn name() {
        assert_eq!(
            ExchangeRateHostProvider::new("key".into()).name(),
            "exchangerate.host"
        );
    }

    #[tokio::test]
    async fn base_only_request_needs_no_network() {
        let provider = ExchangeRateHostProvider::with_base_url("key".into(), DEAD_HOST);
        let rates = provider.fetch_rates("EUR", &[]).await.unwrap();
        assert_eq!(rates, HashMap::from([("EUR".to_string(), 1.0)]));
    }

    #[tokio::test]
    async fn unreachable_host_does_not_leak_key() {
        let provider = ExchangeRateHostProvider::with_base_url("s3cret".into(), DEAD_HOST);
        let err = provider
            .fetch_rates("USD", &codes(&["AUD"]))
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("s3cret"));
    }
}
