pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod session;
pub mod storage;

use chrono::NaiveDate;
use models::{
    analytics::{
        CategorySummary, DisplayTotals, LedgerSummary, Period, ProfitPoint, Totals,
        TransactionView,
    },
    currency::{normalize_code, CurrencyTable},
    settings::Settings,
    state::UserState,
    transaction::{Transaction, TransactionId, TransactionInput},
    transfer::ImportReport,
};
use providers::registry::RateProviderRegistry;
use services::{
    analytics_service::AnalyticsService,
    chart_service::ChartService,
    conversion_service::ConversionService,
    ledger_service::LedgerService,
    rate_service::{RateSource, RateService},
    rebase_service::RebaseService,
    transfer_service::TransferService,
};
use storage::{gateway::PersistenceGateway, manager::StorageManager};
use tracing::{debug, warn};

use errors::CoreError;

/// What a canonical-currency change did.
#[derive(Debug, Clone, PartialEq)]
pub struct RebaseOutcome {
    pub from: String,
    pub to: String,
    /// Multiplier applied to every stored amount
    pub factor: f64,
    /// The target had no usable rate; amounts were kept as they were
    pub degraded: bool,
}

/// Main entry point for the trade ledger core library.
/// Owns one user's state and all services needed to operate on it.
#[must_use]
pub struct TradeLedger {
    state: UserState,
    ledger_service: LedgerService,
    conversion_service: ConversionService,
    rebase_service: RebaseService,
    analytics_service: AnalyticsService,
    chart_service: ChartService,
    rate_service: RateService,
    transfer_service: TransferService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for TradeLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeLedger")
            .field("transactions", &self.state.ledger.len())
            .field("canonical", &self.state.currency_table.canonical_currency())
            .field("display", &self.state.currency_table.display_currency())
            .field("rate_providers", &self.rate_service.provider_names())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl TradeLedger {
    /// Brand new empty ledger with the default rate table and settings.
    pub fn create_new() -> Self {
        Self::build(UserState::default())
    }

    /// Wrap an existing state, e.g. one fetched from a gateway.
    pub fn from_state(state: UserState) -> Self {
        Self::build(state)
    }

    fn build(state: UserState) -> Self {
        let registry = RateProviderRegistry::new_with_defaults(&state.settings.api_keys);
        Self {
            state,
            ledger_service: LedgerService::new(),
            conversion_service: ConversionService::new(),
            rebase_service: RebaseService::new(),
            analytics_service: AnalyticsService::new(),
            chart_service: ChartService::new(),
            rate_service: RateService::new(registry),
            transfer_service: TransferService::new(),
            dirty: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &UserState {
        &self.state
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Load from encrypted bytes. Use this where the host handles file I/O.
    pub fn load_from_bytes(encrypted: &[u8], password: &str) -> Result<Self, CoreError> {
        let state = StorageManager::load_from_bytes(encrypted, password)?;
        Ok(Self::build(state))
    }

    /// Encrypt the current state. Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self, password: &str) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.state, password)?;
        self.dirty = false;
        Ok(bytes)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str, password: &str) -> Result<Self, CoreError> {
        let state = StorageManager::load_from_file(path, password)?;
        Ok(Self::build(state))
    }

    /// Clears the unsaved-changes flag on success.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(&mut self, path: &str, password: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.state, path, password)?;
        self.dirty = false;
        Ok(())
    }

    /// Load `user_key` from `gateway`, or start fresh if it was never saved.
    pub async fn load(gateway: &dyn PersistenceGateway, user_key: &str) -> Result<Self, CoreError> {
        match gateway.load(user_key).await? {
            Some(state) => {
                debug!(user = user_key, transactions = state.ledger.len(), "user state loaded");
                Ok(Self::build(state))
            }
            None => {
                debug!(user = user_key, "no saved state; starting a new ledger");
                Ok(Self::create_new())
            }
        }
    }

    /// Write the current state through `gateway`.
    ///
    /// On failure the in-memory state is kept as is and
    /// `has_unsaved_changes()` stays `true`, so the caller can retry.
    pub async fn persist(
        &mut self,
        gateway: &dyn PersistenceGateway,
        user_key: &str,
    ) -> Result<(), CoreError> {
        match gateway.save(user_key, &self.state).await {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!(user = user_key, error = %e, "persisting user state failed; memory is ahead of storage");
                Err(e)
            }
        }
    }

    /// Re-encrypt with a new password and return the new bytes.
    ///
    /// `last_saved_bytes` must be the most recent save; the current password
    /// is verified by decrypting them. Fails with `CoreError::Decryption`
    /// when it does not match.
    pub fn change_password(
        &mut self,
        last_saved_bytes: &[u8],
        current_password: &str,
        new_password: &str,
    ) -> Result<Vec<u8>, CoreError> {
        StorageManager::load_from_bytes(last_saved_bytes, current_password)?;
        let new_bytes = StorageManager::save_to_bytes(&self.state, new_password)?;
        self.dirty = false;
        Ok(new_bytes)
    }

    /// Returns `true` if the state has been modified since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Record a transaction; amounts are given in `input.currency`.
    pub fn add_transaction(&mut self, input: TransactionInput) -> Result<TransactionId, CoreError> {
        let id = self.ledger_service.add_transaction(&mut self.state, input)?;
        self.dirty = true;
        Ok(id)
    }

    /// Replace every field but the id. Amounts are re-converted from
    /// `input.currency`.
    pub fn update_transaction(
        &mut self,
        id: &TransactionId,
        input: TransactionInput,
    ) -> Result<(), CoreError> {
        self.ledger_service
            .update_transaction(&mut self.state, id, input)?;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_transaction(&mut self, id: &TransactionId) -> Result<Transaction, CoreError> {
        let removed = self
            .ledger_service
            .remove_transaction(&mut self.state, id)?;
        self.dirty = true;
        Ok(removed)
    }

    #[must_use]
    pub fn get_transaction(&self, id: &TransactionId) -> Option<&Transaction> {
        self.state.ledger.get(id)
    }

    /// All transactions, date ascending.
    #[must_use]
    pub fn get_transactions(&self) -> &[Transaction] {
        self.state.ledger.as_slice()
    }

    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.state.ledger.len()
    }

    /// Case-insensitive match on item name, notes and category.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Transaction> {
        self.ledger_service.search(&self.state, query)
    }

    // ── Currencies ──────────────────────────────────────────────────

    #[must_use]
    pub fn currency_table(&self) -> &CurrencyTable {
        &self.state.currency_table
    }

    #[must_use]
    pub fn canonical_currency(&self) -> &str {
        self.state.currency_table.canonical_currency()
    }

    /// Display currency, falling back to canonical when unset.
    #[must_use]
    pub fn display_currency(&self) -> &str {
        self.state.currency_table.effective_display_currency()
    }

    /// Presentation only; stored amounts are untouched.
    pub fn set_display_currency(&mut self, currency: Option<&str>) -> Result<(), CoreError> {
        self.state.currency_table.set_display_currency(currency)?;
        self.dirty = true;
        Ok(())
    }

    /// Manually override one rate (units of `currency` per canonical unit).
    pub fn set_rate(&mut self, currency: &str, rate: f64) -> Result<(), CoreError> {
        self.state.currency_table.set_rate(currency, rate)?;
        self.dirty = true;
        Ok(())
    }

    /// Convert between any two codes with the current table.
    #[must_use]
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        self.conversion_service
            .convert_between(amount, from, to, &self.state.currency_table)
    }

    /// Fetch fresh rates for the supported currencies. Never fails: when every
    /// provider is down the previous (or an all-ones) table is kept, and the
    /// returned source says which.
    pub async fn refresh_rates(&mut self, today: NaiveDate) -> RateSource {
        let refresh = self
            .rate_service
            .refresh(
                &self.state.currency_table,
                &self.state.settings.supported_currencies,
                today,
            )
            .await;

        if refresh.table != self.state.currency_table {
            self.state.currency_table = refresh.table;
            self.dirty = true;
        }
        refresh.source
    }

    /// Replace the rate providers, e.g. with offline or mock sources.
    pub fn set_rate_registry(&mut self, registry: RateProviderRegistry) {
        self.rate_service = RateService::new(registry);
    }

    /// Move every stored amount and the rate table onto `new_canonical`.
    ///
    /// The new table and ledger are computed first and swapped in together.
    pub fn change_canonical_currency(&mut self, new_canonical: &str) -> Result<RebaseOutcome, CoreError> {
        let from = self.canonical_currency().to_string();
        let rebased = self.rebase_service.rebase(
            &self.state.currency_table,
            &self.state.ledger,
            new_canonical,
        )?;

        let outcome = RebaseOutcome {
            from,
            to: rebased.table.canonical_currency().to_string(),
            factor: rebased.factor,
            degraded: rebased.degraded,
        };

        if outcome.from != outcome.to {
            self.state.currency_table = rebased.table;
            self.state.ledger = rebased.ledger;
            self.dirty = true;
        }
        Ok(outcome)
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Totals in the canonical currency.
    #[must_use]
    pub fn totals(&self) -> Totals {
        self.analytics_service.totals_for(&self.state.ledger)
    }

    /// Totals in the display currency.
    #[must_use]
    pub fn display_totals(&self) -> DisplayTotals {
        self.analytics_service.display_totals(
            &self.state.ledger,
            &self.state.currency_table,
            self.display_currency(),
        )
    }

    #[must_use]
    pub fn summary(&self) -> LedgerSummary {
        self.analytics_service.summary(
            &self.state.ledger,
            &self.state.currency_table,
            self.display_currency(),
        )
    }

    #[must_use]
    pub fn category_breakdown(&self) -> Vec<CategorySummary> {
        self.analytics_service.category_breakdown(
            &self.state.ledger,
            &self.state.currency_table,
            self.display_currency(),
        )
    }

    /// Table rows in the display currency, date ascending.
    #[must_use]
    pub fn transaction_views(&self) -> Vec<TransactionView> {
        self.analytics_service.transaction_views(
            &self.state.ledger,
            &self.state.currency_table,
            self.display_currency(),
        )
    }

    /// Cumulative profit curve in the display currency.
    #[must_use]
    pub fn cumulative_profit_series(&self, period: Period, today: NaiveDate) -> Vec<ProfitPoint> {
        self.chart_service.cumulative_profit_series(
            &self.state.ledger,
            period,
            &self.state.currency_table,
            self.display_currency(),
            today,
        )
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Pretty JSON backup of the ledger and rate table.
    pub fn export_json(&self) -> Result<String, CoreError> {
        self.transfer_service.export_json(&self.state)
    }

    /// Restore from a JSON document, or append a bare array of records.
    pub fn import_json(&mut self, json: &str) -> Result<ImportReport, CoreError> {
        let report = self.transfer_service.import_json(&mut self.state, json)?;
        if report.changed_state() {
            self.dirty = true;
        }
        Ok(report)
    }

    /// Spreadsheet export in the display currency.
    pub fn export_csv(&self) -> Result<String, CoreError> {
        self.transfer_service
            .export_csv(&self.state, self.display_currency())
    }

    /// Append spreadsheet rows whose amounts are in `currency`.
    pub fn import_csv(&mut self, csv_text: &str, currency: &str) -> Result<ImportReport, CoreError> {
        let report = self
            .transfer_service
            .import_csv(&mut self.state, csv_text, currency)?;
        if report.changed_state() {
            self.dirty = true;
        }
        Ok(report)
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Currencies requested on every rate refresh. Codes are normalized and
    /// de-duplicated; the canonical currency is always included.
    pub fn set_supported_currencies(&mut self, currencies: &[&str]) -> Result<(), CoreError> {
        let mut codes: Vec<String> = Vec::with_capacity(currencies.len() + 1);
        for code in currencies {
            let code = normalize_code(code)?;
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        let canonical = self.canonical_currency().to_string();
        if !codes.contains(&canonical) {
            codes.push(canonical);
        }
        self.state.settings.supported_currencies = codes;
        self.dirty = true;
        Ok(())
    }

    /// Set an API key for a rate provider (e.g., "exchangerate_host").
    /// Rebuilds the provider registry so the new key takes effect immediately.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.state.settings.api_keys.insert(provider, key);
        self.rebuild_registry();
        self.dirty = true;
    }

    /// Remove an API key for a rate provider.
    /// Rebuilds the provider registry so the removal takes effect immediately.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.state.settings.api_keys.remove(provider).is_some();
        if removed {
            self.rebuild_registry();
            self.dirty = true;
        }
        removed
    }

    /// Names of the active rate providers, in priority order.
    #[must_use]
    pub fn rate_provider_names(&self) -> Vec<String> {
        self.rate_service.provider_names()
    }

    fn rebuild_registry(&mut self) {
        let registry = RateProviderRegistry::new_with_defaults(&self.state.settings.api_keys);
        self.rate_service = RateService::new(registry);
    }
}
