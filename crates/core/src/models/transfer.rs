use serde::{Deserialize, Serialize};

use super::currency::CurrencyTable;
use super::ledger::Ledger;
use super::settings::Settings;
use super::state::UserState;
use super::transaction::Transaction;

/// Version written into every JSON export and every sealed container.
pub const EXPORT_VERSION: u16 = 1;

/// Human-readable backup of a full ledger and its rate table.
///
/// Sealed containers carry the same document plus `settings`; plain JSON
/// exports leave them out so API keys never land in a backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u16,
    pub currency_table: CurrencyTable,
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl ExportDocument {
    /// Ledger and rate table of `state`, without settings.
    pub fn backup_of(state: &UserState) -> Self {
        Self {
            version: EXPORT_VERSION,
            currency_table: state.currency_table.clone(),
            transactions: state.ledger.as_slice().to_vec(),
            settings: None,
        }
    }

    /// Everything in `state`.
    pub fn full_copy_of(state: &UserState) -> Self {
        Self {
            settings: Some(state.settings.clone()),
            ..Self::backup_of(state)
        }
    }

    /// Missing settings fall back to the defaults.
    pub fn into_state(self) -> UserState {
        UserState {
            ledger: Ledger::from_transactions(self.transactions),
            currency_table: self.currency_table,
            settings: self.settings.unwrap_or_default(),
        }
    }
}

/// One record that an import skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Zero-based position of the record in the imported batch
    pub index: usize,
    pub reason: String,
}

/// What an import did: accepted records were applied, rejected ones skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRecord>,
    /// The ledger (and the rate table, if one came along) was swapped for
    /// the imported one, even when it brought no records
    #[serde(default)]
    pub replaced: bool,
}

impl ImportReport {
    /// True when the import touched the user's state at all.
    #[must_use]
    pub fn changed_state(&self) -> bool {
        self.replaced || self.accepted > 0
    }

    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.accepted + self.rejected.len()
    }
}
