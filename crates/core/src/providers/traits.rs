use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::CoreError;

/// Trait abstraction for exchange-rate sources.
///
/// Each HTTP source (Frankfurter, exchangerate.host) implements this trait.
/// A broken or changed API is fixed in its own implementation only.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RateProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest rates relative to `base`: code → units of code per 1 `base`.
    ///
    /// Should include `base -> 1.0`. Codes the source does not know may be
    /// omitted from the result.
    async fn fetch_rates(
        &self,
        base: &str,
        wanted: &[String],
    ) -> Result<HashMap<String, f64>, CoreError>;
}
