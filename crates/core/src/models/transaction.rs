use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, immutable transaction identifier.
///
/// Freshly created transactions get a UUID v4; imported ids are kept verbatim
/// even when they are not UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of traded item. Open-ended: anything unknown is kept as `Other`.
///
/// `Other` can only be produced by [`Category::parse`], so it never holds a
/// label that reads back as one of the fixed kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    Case,
    Skin,
    Sticker,
    TradeUp,
    Other(CustomLabel),
}

/// Free-form category label that matched none of the fixed kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomLabel(String);

impl CustomLabel {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Category {
    /// Parse a category label (case-insensitive). Empty input means `Case`.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        let normalized: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "" | "case" => Category::Case,
            "skin" => Category::Skin,
            "sticker" => Category::Sticker,
            "tradeup" => Category::TradeUp,
            _ => Category::Other(CustomLabel(trimmed.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Case => write!(f, "Case"),
            Category::Skin => write!(f, "Skin"),
            Category::Sticker => write!(f, "Sticker"),
            Category::TradeUp => write!(f, "Trade-up"),
            Category::Other(label) => write!(f, "{label}"),
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::parse(&value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.to_string()
    }
}

/// A single buy (and possibly sell) of `quantity` identical items.
///
/// **Important**: amounts are totals in the ledger's canonical currency.
/// `sell_amount_canonical == None` means "not sold yet"; a sale at price
/// zero is `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// Trade date (no time of day, daily granularity)
    pub date: NaiveDate,

    pub item_name: String,

    pub category: Category,

    /// Number of identical units; always >= 1
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Total acquisition cost, canonical currency
    pub buy_amount_canonical: f64,

    /// Total sale proceeds, canonical currency; `None` while unsold
    #[serde(default)]
    pub sell_amount_canonical: Option<f64>,

    #[serde(default)]
    pub notes: String,
}

pub(crate) fn default_quantity() -> u32 {
    1
}

impl Transaction {
    #[must_use]
    pub fn is_sold(&self) -> bool {
        self.sell_amount_canonical.is_some()
    }

    /// Net result in canonical currency; an unsold item counts as zero proceeds.
    #[must_use]
    pub fn profit_canonical(&self) -> f64 {
        self.sell_amount_canonical.unwrap_or(0.0) - self.buy_amount_canonical
    }

    /// Realized return in percent; only defined once sold and with a non-zero cost.
    #[must_use]
    pub fn profit_percent(&self) -> Option<f64> {
        let sell = self.sell_amount_canonical?;
        if self.buy_amount_canonical > 0.0 {
            Some((sell - self.buy_amount_canonical) / self.buy_amount_canonical * 100.0)
        } else {
            None
        }
    }

    #[must_use]
    pub fn unit_buy_canonical(&self) -> f64 {
        self.buy_amount_canonical / f64::from(self.quantity.max(1))
    }

    #[must_use]
    pub fn unit_sell_canonical(&self) -> Option<f64> {
        self.sell_amount_canonical
            .map(|s| s / f64::from(self.quantity.max(1)))
    }
}

/// User-entered transaction data, amounts in `currency` (any supported code).
/// Converted to canonical before it reaches the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    pub date: NaiveDate,
    pub item_name: String,
    pub category: Category,
    pub quantity: u32,
    pub buy_amount: f64,
    pub sell_amount: Option<f64>,
    pub notes: String,
    pub currency: String,
}

impl TransactionInput {
    /// Single-unit, unsold purchase with no notes.
    pub fn buy(
        date: NaiveDate,
        item_name: impl Into<String>,
        category: Category,
        buy_amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            date,
            item_name: item_name.into(),
            category,
            quantity: 1,
            buy_amount,
            sell_amount: None,
            notes: String::new(),
            currency: currency.into(),
        }
    }

    #[must_use]
    pub fn sold_for(mut self, sell_amount: f64) -> Self {
        self.sell_amount = Some(sell_amount);
        self
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
