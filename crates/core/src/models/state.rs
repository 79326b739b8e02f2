use serde::{Deserialize, Serialize};

use super::currency::CurrencyTable;
use super::ledger::Ledger;
use super::settings::Settings;

/// Everything one user owns. This is the unit that gets persisted,
/// encrypted, and passed through every engine operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    /// All transactions, amounts in the canonical currency
    pub ledger: Ledger,

    /// Canonical/display currency and the rate table
    pub currency_table: CurrencyTable,

    /// Supported currencies, rate-source API keys
    #[serde(default)]
    pub settings: Settings,
}
