use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::transaction::{Category, Transaction};

/// Aggregates in the canonical currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of all buy amounts
    pub spent_canonical: f64,

    /// Sum of (sell or 0) − buy over all transactions
    pub net_canonical: f64,

    /// net / spent × 100, or 0 when nothing was spent
    pub profit_percent: f64,
}

/// Aggregates converted to a display currency (converted after summing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayTotals {
    pub currency: String,
    pub spent: f64,
    pub net: f64,
    pub profit_percent: f64,
}

/// Summary of the whole ledger, everything in `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub currency: String,

    pub total_transactions: usize,

    /// Transactions with a recorded sale
    pub sold_count: usize,

    /// Transactions still held
    pub open_count: usize,

    /// Date of the earliest transaction, if any
    pub inception_date: Option<NaiveDate>,

    pub totals: DisplayTotals,

    /// Per-category breakdown, largest spend first
    pub categories: Vec<CategorySummary>,
}

/// Aggregates for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub spent: f64,
    pub net: f64,
    pub profit_percent: f64,
}

/// One transaction as presented in a table, amounts in `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub currency: String,
    pub buy: f64,
    pub unit_buy: f64,
    /// `None` while unsold
    pub sell: Option<f64>,
    /// sell − buy; `None` while unsold
    pub profit: Option<f64>,
    /// Realized return; `None` while unsold or when bought for free
    pub profit_percent: Option<f64>,
}

/// Look-back window for trend analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Today and yesterday (dates carry no time of day)
    Last24Hours,
    /// The last seven days plus today
    Last7Days,
    /// From the first of the current month through today
    MonthToDate,
    /// Everything, including future-dated entries
    AllTime,
}

impl Period {
    /// First date inside the window, `None` for `AllTime`.
    #[must_use]
    pub fn start(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Last24Hours => Some(today - Duration::days(1)),
            Period::Last7Days => Some(today - Duration::days(7)),
            Period::MonthToDate => today.with_day(1),
            Period::AllTime => None,
        }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self.start(today) {
            Some(start) => date >= start && date <= today,
            None => true,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Last24Hours => write!(f, "24h"),
            Period::Last7Days => write!(f, "week"),
            Period::MonthToDate => write!(f, "month"),
            Period::AllTime => write!(f, "all"),
        }
    }
}

/// A single point on the cumulative profit curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitPoint {
    pub date: NaiveDate,

    /// Running profit up to and including `date`, in the display currency
    pub cumulative_value: f64,

    /// Profit booked on this date alone, in the display currency
    pub daily_value: f64,
}
