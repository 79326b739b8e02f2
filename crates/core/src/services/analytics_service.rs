use std::collections::HashMap;

use crate::models::analytics::{
    CategorySummary, DisplayTotals, LedgerSummary, Totals, TransactionView,
};
use crate::models::currency::CurrencyTable;
use crate::models::ledger::Ledger;
use crate::models::transaction::{Category, Transaction};
use crate::services::conversion_service::ConversionService;

/// Computes spend, profit/loss and return figures over a ledger.
///
/// All sums are taken in the canonical currency and converted once at the
/// end, so the result does not depend on which display currency is chosen.
pub struct AnalyticsService {
    conversion: ConversionService,
}

impl AnalyticsService {
    pub fn new() -> Self {
        Self {
            conversion: ConversionService::new(),
        }
    }

    /// Canonical totals over every transaction.
    pub fn totals_for(&self, ledger: &Ledger) -> Totals {
        Self::sum(ledger.iter())
    }

    /// Totals converted to `currency`. Percentages are currency-independent.
    pub fn display_totals(
        &self,
        ledger: &Ledger,
        table: &CurrencyTable,
        currency: &str,
    ) -> DisplayTotals {
        self.to_display(self.totals_for(ledger), table, currency)
    }

    /// Per-category figures in `currency`, largest spend first.
    pub fn category_breakdown(
        &self,
        ledger: &Ledger,
        table: &CurrencyTable,
        currency: &str,
    ) -> Vec<CategorySummary> {
        let mut groups: HashMap<&Category, Vec<&Transaction>> = HashMap::new();
        let mut order: Vec<&Category> = Vec::new();
        for tx in ledger {
            let group = groups.entry(&tx.category).or_default();
            if group.is_empty() {
                order.push(&tx.category);
            }
            group.push(tx);
        }

        let mut summaries: Vec<CategorySummary> = order
            .into_iter()
            .map(|category| {
                let txs = &groups[category];
                let totals = self.to_display(Self::sum(txs.iter().copied()), table, currency);
                CategorySummary {
                    category: category.clone(),
                    count: txs.len(),
                    spent: totals.spent,
                    net: totals.net,
                    profit_percent: totals.profit_percent,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.spent
                .partial_cmp(&a.spent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        summaries
    }

    /// Table rows in reporting order (date ascending), amounts in `currency`.
    pub fn transaction_views(
        &self,
        ledger: &Ledger,
        table: &CurrencyTable,
        currency: &str,
    ) -> Vec<TransactionView> {
        ledger
            .iter()
            .map(|tx| self.transaction_view(tx, table, currency))
            .collect()
    }

    pub fn transaction_view(
        &self,
        tx: &Transaction,
        table: &CurrencyTable,
        currency: &str,
    ) -> TransactionView {
        let convert = |amount: f64| self.conversion.from_canonical(amount, currency, table);
        let buy = convert(tx.buy_amount_canonical);
        let sell = tx.sell_amount_canonical.map(convert);
        TransactionView {
            transaction: tx.clone(),
            currency: currency.to_uppercase(),
            buy,
            unit_buy: convert(tx.unit_buy_canonical()),
            sell,
            profit: sell.map(|s| s - buy),
            profit_percent: tx.profit_percent(),
        }
    }

    /// Full summary: counts, totals and category breakdown in `currency`.
    pub fn summary(&self, ledger: &Ledger, table: &CurrencyTable, currency: &str) -> LedgerSummary {
        let sold_count = ledger.iter().filter(|t| t.is_sold()).count();
        LedgerSummary {
            currency: currency.to_uppercase(),
            total_transactions: ledger.len(),
            sold_count,
            open_count: ledger.len() - sold_count,
            inception_date: ledger.iter().map(|t| t.date).min(),
            totals: self.display_totals(ledger, table, currency),
            categories: self.category_breakdown(ledger, table, currency),
        }
    }

    fn sum<'a>(txs: impl Iterator<Item = &'a Transaction>) -> Totals {
        let (spent, net) = txs.fold((0.0, 0.0), |(spent, net), tx| {
            (spent + tx.buy_amount_canonical, net + tx.profit_canonical())
        });
        Totals {
            spent_canonical: spent,
            net_canonical: net,
            profit_percent: percent_of(net, spent),
        }
    }

    fn to_display(&self, totals: Totals, table: &CurrencyTable, currency: &str) -> DisplayTotals {
        DisplayTotals {
            currency: currency.to_uppercase(),
            spent: self
                .conversion
                .from_canonical(totals.spent_canonical, currency, table),
            net: self
                .conversion
                .from_canonical(totals.net_canonical, currency, table),
            profit_percent: totals.profit_percent,
        }
    }
}

/// `part / whole * 100`, or 0 when `whole` is not positive.
pub(crate) fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
