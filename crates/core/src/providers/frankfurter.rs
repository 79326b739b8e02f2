use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use super::quote_codes;
use super::traits::RateProvider;
use crate::errors::CoreError;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter API provider for fiat currency exchange rates.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) data.
/// - **Coverage**: ~30 currencies (EUR, USD, AUD, GBP, JPY, etc.)
/// - **Endpoint**: `/latest?base={base}&symbols={codes}`
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the provider at a different host (mirrors, self-hosted instances).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(10));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    async fn fetch_rates(
        &self,
        base: &str,
        wanted: &[String],
    ) -> Result<HashMap<String, f64>, CoreError> {
        let base = base.to_uppercase();
        let mut result = HashMap::from([(base.clone(), 1.0)]);

        // Only the base requested → nothing to ask for
        let symbols = quote_codes(&base, wanted);
        if symbols.is_empty() {
            return Ok(result);
        }

        let url = format!(
            "{}/latest?base={base}&symbols={}",
            self.base_url,
            symbols.join(",")
        );

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse rates for base {base}: {e}"),
            })?;

        for code in symbols {
            if let Some(rate) = resp.rates.get(&code) {
                result.insert(code, *rate);
            }
        }

        Ok(result)
    }
}
