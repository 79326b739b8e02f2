use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use super::quote_codes;
use super::traits::RateProvider;
use crate::errors::CoreError;

const BASE_URL: &str = "https://api.exchangerate.host";

/// exchangerate.host provider, used as the fallback rate source.
///
/// - **Requires**: API key (set via settings as "exchangerate_host").
/// - **Endpoint**: `/live?source={base}&currencies={codes}`
/// - **Quotes** come back keyed by concatenated pairs, e.g. `"USDEUR": 0.92`.
pub struct ExchangeRateHostProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ExchangeRateHostProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(10));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

// ── exchangerate.host API response types ────────────────────────────

#[derive(Deserialize)]
struct LiveResponse {
    success: bool,
    #[serde(default)]
    quotes: HashMap<String, f64>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    info: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RateProvider for ExchangeRateHostProvider {
    fn name(&self) -> &str {
        "exchangerate.host"
    }

    async fn fetch_rates(
        &self,
        base: &str,
        wanted: &[String],
    ) -> Result<HashMap<String, f64>, CoreError> {
        let base = base.to_uppercase();
        let mut result = HashMap::from([(base.clone(), 1.0)]);

        let currencies = quote_codes(&base, wanted);
        if currencies.is_empty() {
            return Ok(result);
        }

        let url = format!(
            "{}/live?access_key={}&source={base}&currencies={}",
            self.base_url,
            self.api_key,
            currencies.join(",")
        );

        let resp: LiveResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "exchangerate.host".into(),
                message: format!("Failed to parse live quotes for {base}: {e}"),
            })?;

        if !resp.success {
            let detail = resp
                .error
                .and_then(|e| e.info.or(e.kind))
                .unwrap_or_else(|| "request rejected".to_string());
            return Err(CoreError::Api {
                provider: "exchangerate.host".into(),
                message: detail,
            });
        }

        for code in currencies {
            if let Some(rate) = resp.quotes.get(&format!("{base}{code}")) {
                result.insert(code, *rate);
            }
        }

        Ok(result)
    }
}
