use tracing::debug;

use crate::errors::CoreError;
use crate::models::currency::normalize_code;
use crate::models::state::UserState;
use crate::models::transaction::{Transaction, TransactionId, TransactionInput};
use crate::services::conversion_service::ConversionService;

/// Manages ledger entries: add, edit, delete and query.
///
/// Every amount is converted to the canonical currency before it is stored.
/// Pure business logic, no I/O.
pub struct LedgerService {
    conversion: ConversionService,
}

impl LedgerService {
    pub fn new() -> Self {
        Self {
            conversion: ConversionService::new(),
        }
    }

    /// Validate `input`, convert its amounts and file it in date order.
    pub fn add_transaction(
        &self,
        state: &mut UserState,
        input: TransactionInput,
    ) -> Result<TransactionId, CoreError> {
        let tx = self.build(state, TransactionId::generate(), input)?;
        let id = tx.id.clone();
        debug!(id = %id, date = %tx.date, "transaction added");
        state.ledger.insert(tx);
        Ok(id)
    }

    /// Replace every field of an existing transaction except its id.
    pub fn update_transaction(
        &self,
        state: &mut UserState,
        id: &TransactionId,
        input: TransactionInput,
    ) -> Result<(), CoreError> {
        if !state.ledger.contains(id) {
            return Err(CoreError::TransactionNotFound(id.to_string()));
        }
        let tx = self.build(state, id.clone(), input)?;
        state.ledger.replace(tx);
        debug!(id = %id, "transaction updated");
        Ok(())
    }

    pub fn remove_transaction(
        &self,
        state: &mut UserState,
        id: &TransactionId,
    ) -> Result<Transaction, CoreError> {
        let removed = state
            .ledger
            .remove(id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        debug!(id = %id, "transaction removed");
        Ok(removed)
    }

    /// Case-insensitive match on item name, notes and category.
    pub fn search<'a>(&self, state: &'a UserState, query: &str) -> Vec<&'a Transaction> {
        let q = query.trim().to_lowercase();
        state
            .ledger
            .iter()
            .filter(|t| {
                q.is_empty()
                    || t.item_name.to_lowercase().contains(&q)
                    || t.notes.to_lowercase().contains(&q)
                    || t.category.to_string().to_lowercase().contains(&q)
            })
            .collect()
    }

    fn build(
        &self,
        state: &UserState,
        id: TransactionId,
        input: TransactionInput,
    ) -> Result<Transaction, CoreError> {
        self.validate_input(&input)?;
        let currency = normalize_code(&input.currency)?;
        let table = &state.currency_table;

        Ok(Transaction {
            id,
            date: input.date,
            item_name: input.item_name.trim().to_string(),
            category: input.category,
            quantity: input.quantity,
            buy_amount_canonical: self.conversion.to_canonical(input.buy_amount, &currency, table),
            sell_amount_canonical: input
                .sell_amount
                .map(|s| self.conversion.to_canonical(s, &currency, table)),
            notes: input.notes.trim().to_string(),
        })
    }

    fn validate_input(&self, input: &TransactionInput) -> Result<(), CoreError> {
        if input.item_name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Item name must not be empty".into(),
            ));
        }
        if input.quantity == 0 {
            return Err(CoreError::ValidationError(
                "Quantity must be at least 1".into(),
            ));
        }
        if !input.buy_amount.is_finite() || input.buy_amount < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Buy amount must be a finite, non-negative number, got {}",
                input.buy_amount
            )));
        }
        if let Some(sell) = input.sell_amount {
            if !sell.is_finite() || sell < 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "Sell amount must be a finite, non-negative number, got {sell}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}
