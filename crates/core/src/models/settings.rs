use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::currency::DEFAULT_SUPPORTED;

/// User-configurable settings, stored alongside the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Currencies requested from rate sources on every refresh (e.g., "AUD", "USD", "EUR").
    pub supported_currencies: Vec<String>,

    /// Optional API keys for rate sources that require them.
    /// Keys: provider name (e.g., "exchangerate_host").
    /// Values: the API key string.
    pub api_keys: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            supported_currencies: DEFAULT_SUPPORTED.iter().map(|c| c.to_string()).collect(),
            api_keys: HashMap::new(),
        }
    }
}
