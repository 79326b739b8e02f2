use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::transaction::{Transaction, TransactionId};

/// Ordered collection of transactions.
///
/// Kept sorted by date ascending; transactions sharing a date stay in
/// insertion order. Serializes as a bare array; deserializing re-sorts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from an arbitrary list, restoring date order (stable).
    pub fn from_transactions(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|t| t.date);
        Self { transactions }
    }

    /// Insert after every transaction dated on or before `tx.date`.
    pub fn insert(&mut self, tx: Transaction) {
        let pos = self.transactions.partition_point(|t| t.date <= tx.date);
        self.transactions.insert(pos, tx);
    }

    pub fn remove(&mut self, id: &TransactionId) -> Option<Transaction> {
        let idx = self.position(id)?;
        Some(self.transactions.remove(idx))
    }

    /// Replace the transaction carrying `tx.id`. Keeps its slot when the date
    /// is unchanged, otherwise re-files it at the end of its new date group.
    /// Returns the previous version.
    pub fn replace(&mut self, tx: Transaction) -> Option<Transaction> {
        let idx = self.position(&tx.id)?;
        if self.transactions[idx].date == tx.date {
            return Some(std::mem::replace(&mut self.transactions[idx], tx));
        }
        let old = self.transactions.remove(idx);
        self.insert(tx);
        Some(old)
    }

    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &TransactionId) -> bool {
        self.position(id).is_some()
    }

    /// Transactions in reporting order.
    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Transaction] {
        &self.transactions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Copy of the ledger with every monetary amount passed through `f`.
    /// All other fields and the order are untouched.
    pub(crate) fn map_amounts(&self, f: impl Fn(f64) -> f64) -> Self {
        let transactions = self
            .transactions
            .iter()
            .map(|t| Transaction {
                buy_amount_canonical: f(t.buy_amount_canonical),
                sell_amount_canonical: t.sell_amount_canonical.map(&f),
                ..t.clone()
            })
            .collect();
        Self { transactions }
    }

    fn position(&self, id: &TransactionId) -> Option<usize> {
        self.transactions.iter().position(|t| &t.id == id)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.transactions.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Transaction>::deserialize(deserializer).map(Self::from_transactions)
    }
}
