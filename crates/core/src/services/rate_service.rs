use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::currency::CurrencyTable;
use crate::providers::registry::RateProviderRegistry;

/// Where the rates of a refreshed table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateSource {
    /// Fetched from the named provider
    Provider(String),
    /// Every provider failed; the previously known table was kept
    Previous,
    /// Every provider failed and nothing was known; all rates set to 1
    Default,
}

/// Outcome of a rate refresh. `table` is always usable.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRefresh {
    pub table: CurrencyTable,
    pub source: RateSource,
}

/// Refreshes the rate table from the registered providers.
///
/// Providers are tried in registration order; the first one returning a
/// valid rate map wins. When all of them fail, the previously known table is
/// kept, or an all-ones table is produced on first run. Never fails: the
/// ledger stays usable with stale or default rates.
pub struct RateService {
    registry: RateProviderRegistry,
}

impl RateService {
    pub fn new(registry: RateProviderRegistry) -> Self {
        Self { registry }
    }

    /// Names of the configured providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Fetch fresh rates for `wanted` against the table's canonical currency.
    ///
    /// The canonical currency is kept; the rate map is replaced. Wanted codes
    /// the winning provider did not return keep their previous rate.
    pub async fn refresh(
        &self,
        table: &CurrencyTable,
        wanted: &[String],
        today: NaiveDate,
    ) -> RateRefresh {
        let canonical = table.canonical_currency().to_string();

        match self.fetch(&canonical, wanted).await {
            Ok((provider, mut rates)) => {
                for code in wanted {
                    let code = code.trim().to_uppercase();
                    if rates.contains_key(&code) {
                        continue;
                    }
                    if let Some(previous) = table.rate(&code) {
                        warn!(provider = %provider, currency = %code, "rate missing from source; keeping previous value");
                        rates.insert(code, previous);
                    }
                }

                let mut refreshed = table.clone();
                refreshed.replace_rates(rates);
                refreshed.set_rates_as_of(Some(today));
                debug!(provider = %provider, canonical = %canonical, "rates refreshed");

                RateRefresh {
                    table: refreshed,
                    source: RateSource::Provider(provider),
                }
            }
            Err(e) => {
                warn!(error = %e, "falling back to stored rates");
                if table.has_foreign_rates() {
                    return RateRefresh {
                        table: table.clone(),
                        source: RateSource::Previous,
                    };
                }

                let mut fallback = CurrencyTable::all_ones(&canonical, &Self::valid_codes(wanted))
                    .unwrap_or_else(|_| table.clone());
                if let Err(e) = fallback.set_display_currency(table.display_currency()) {
                    warn!(error = %e, "dropping unusable display currency");
                }
                RateRefresh {
                    table: fallback,
                    source: RateSource::Default,
                }
            }
        }
    }

    /// Ask each provider in turn; return the first valid answer.
    async fn fetch(
        &self,
        canonical: &str,
        wanted: &[String],
    ) -> Result<(String, HashMap<String, f64>), CoreError> {
        let mut failures: Vec<String> = Vec::new();

        for provider in self.registry.providers() {
            let result = provider
                .fetch_rates(canonical, wanted)
                .await
                .and_then(|rates| Self::validate(provider.name(), canonical, rates));

            match result {
                Ok(rates) => return Ok((provider.name().to_string(), rates)),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "rate provider failed");
                    failures.push(format!("{}: {e}", provider.name()));
                    // Try next provider
                }
            }
        }

        if failures.is_empty() {
            Err(CoreError::RateSourceUnavailable(
                "no rate providers registered".into(),
            ))
        } else {
            Err(CoreError::RateSourceUnavailable(failures.join("; ")))
        }
    }

    /// Every rate finite and positive; canonical maps to 1 (inserted if absent).
    fn validate(
        provider: &str,
        canonical: &str,
        rates: HashMap<String, f64>,
    ) -> Result<HashMap<String, f64>, CoreError> {
        let mut checked = HashMap::with_capacity(rates.len() + 1);
        for (code, rate) in rates {
            let code = code.trim().to_uppercase();
            if !rate.is_finite() || rate <= 0.0 {
                return Err(CoreError::Api {
                    provider: provider.to_string(),
                    message: format!(
                        "Invalid rate returned for {code}: {rate} (must be finite and positive)"
                    ),
                });
            }
            checked.insert(code, rate);
        }

        match checked.get(canonical) {
            Some(rate) if (*rate - 1.0).abs() > 1e-9 => Err(CoreError::Api {
                provider: provider.to_string(),
                message: format!("Canonical currency {canonical} quoted at {rate}, expected 1"),
            }),
            Some(_) => Ok(checked),
            None => {
                checked.insert(canonical.to_string(), 1.0);
                Ok(checked)
            }
        }
    }

    fn valid_codes(wanted: &[String]) -> Vec<String> {
        wanted
            .iter()
            .filter_map(|c| crate::models::currency::normalize_code(c).ok())
            .collect()
    }
}
