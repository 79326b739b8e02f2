use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

/// Canonical currency of a freshly created table.
pub const DEFAULT_CANONICAL: &str = "USD";

/// Currencies offered out of the box (rate-source request list).
pub const DEFAULT_SUPPORTED: [&str; 3] = ["AUD", "USD", "EUR"];

/// Validate and normalize a currency code: trimmed, 3 ASCII letters, uppercased.
pub fn normalize_code(code: &str) -> Result<String, CoreError> {
    let trimmed = code.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "Invalid currency code '{code}': must be exactly 3 ASCII letters (e.g., USD, EUR, AUD)"
        )));
    }
    Ok(trimmed)
}

/// Exchange-rate table anchored on the canonical currency.
///
/// `rates[code]` is the number of `code` units equal to 1 canonical unit.
/// `rates[canonical] == 1` holds after every constructor, mutation and
/// deserialization; callers cannot reach the map mutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CurrencyTableRepr")]
pub struct CurrencyTable {
    canonical_currency: String,
    display_currency: Option<String>,
    rates: HashMap<String, f64>,
    rates_as_of: Option<NaiveDate>,
}

/// Wire shape; every incoming table is normalized through `From`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrencyTableRepr {
    #[serde(alias = "baseCurrency")]
    canonical_currency: String,
    #[serde(default)]
    display_currency: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(default)]
    rates_as_of: Option<NaiveDate>,
}

impl From<CurrencyTableRepr> for CurrencyTable {
    fn from(repr: CurrencyTableRepr) -> Self {
        let canonical = repr.canonical_currency.trim().to_uppercase();
        let display = repr
            .display_currency
            .map(|d| d.trim().to_uppercase())
            .filter(|d| !d.is_empty());
        let mut table = Self {
            canonical_currency: canonical,
            display_currency: display,
            rates: HashMap::new(),
            rates_as_of: repr.rates_as_of,
        };
        table.replace_rates(repr.rates);
        table
    }
}

impl CurrencyTable {
    /// A table with only the canonical rate (1.0).
    pub fn new(canonical: &str) -> Result<Self, CoreError> {
        let canonical = normalize_code(canonical)?;
        let mut rates = HashMap::new();
        rates.insert(canonical.clone(), 1.0);
        Ok(Self {
            canonical_currency: canonical,
            display_currency: None,
            rates,
            rates_as_of: None,
        })
    }

    /// A table where every listed currency has rate 1.0.
    /// Used on first run and as the last-resort fallback when no rate source answers.
    pub fn all_ones(canonical: &str, codes: &[String]) -> Result<Self, CoreError> {
        let mut table = Self::new(canonical)?;
        for code in codes {
            let code = normalize_code(code)?;
            table.rates.insert(code, 1.0);
        }
        Ok(table)
    }

    /// Build a table from parts, enforcing the canonical-rate invariant.
    /// Non-finite or non-positive rates are dropped.
    pub fn from_parts(
        canonical: &str,
        display: Option<&str>,
        rates: HashMap<String, f64>,
        rates_as_of: Option<NaiveDate>,
    ) -> Result<Self, CoreError> {
        let mut table = Self::new(canonical)?;
        table.display_currency = display.map(normalize_code).transpose()?;
        table.rates_as_of = rates_as_of;
        table.replace_rates(rates);
        Ok(table)
    }

    #[must_use]
    pub fn canonical_currency(&self) -> &str {
        &self.canonical_currency
    }

    /// The explicitly chosen display currency, if any.
    #[must_use]
    pub fn display_currency(&self) -> Option<&str> {
        self.display_currency.as_deref()
    }

    /// Display currency, falling back to canonical when unset.
    #[must_use]
    pub fn effective_display_currency(&self) -> &str {
        self.display_currency
            .as_deref()
            .unwrap_or(&self.canonical_currency)
    }

    #[must_use]
    pub fn rates(&self) -> &HashMap<String, f64> {
        &self.rates
    }

    #[must_use]
    pub fn rates_as_of(&self) -> Option<NaiveDate> {
        self.rates_as_of
    }

    /// Usable rate for `code`: present, finite and strictly positive.
    #[must_use]
    pub fn rate(&self, code: &str) -> Option<f64> {
        let key = code.trim().to_uppercase();
        self.rates
            .get(&key)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    #[must_use]
    pub fn is_canonical(&self, code: &str) -> bool {
        code.trim().eq_ignore_ascii_case(&self.canonical_currency)
    }

    /// True when the table knows at least one rate besides the canonical one.
    #[must_use]
    pub fn has_foreign_rates(&self) -> bool {
        self.rates.keys().any(|k| *k != self.canonical_currency)
    }

    /// Sorted list of all currency codes in the table.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.rates.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn set_display_currency(&mut self, code: Option<&str>) -> Result<(), CoreError> {
        self.display_currency = code.map(normalize_code).transpose()?;
        Ok(())
    }

    /// Manually set one rate. The canonical rate is fixed at 1.
    pub fn set_rate(&mut self, code: &str, rate: f64) -> Result<(), CoreError> {
        let code = normalize_code(code)?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Rate for {code} must be finite and positive, got {rate}"
            )));
        }
        if code == self.canonical_currency && rate != 1.0 {
            return Err(CoreError::ValidationError(format!(
                "Rate of the canonical currency {code} is always 1"
            )));
        }
        self.rates.insert(code, rate);
        Ok(())
    }

    pub fn set_rates_as_of(&mut self, date: Option<NaiveDate>) {
        self.rates_as_of = date;
    }

    /// Replace the whole rate map, keeping the canonical currency.
    pub fn replace_rates(&mut self, rates: HashMap<String, f64>) {
        self.rates = rates
            .into_iter()
            .map(|(code, rate)| (code.trim().to_uppercase(), rate))
            .filter(|(code, rate)| !code.is_empty() && rate.is_finite() && *rate > 0.0)
            .collect();
        self.rates.insert(self.canonical_currency.clone(), 1.0);
    }

    /// Move to a new canonical currency with an already rebased rate map.
    /// Only the rebase engine calls this.
    pub(crate) fn rebased(&self, new_canonical: String, new_rates: HashMap<String, f64>) -> Self {
        let mut table = Self {
            canonical_currency: new_canonical.clone(),
            display_currency: self
                .display_currency
                .clone()
                .or(Some(new_canonical)),
            rates: HashMap::new(),
            rates_as_of: self.rates_as_of,
        };
        table.replace_rates(new_rates);
        table
    }
}

impl Default for CurrencyTable {
    fn default() -> Self {
        let mut rates = HashMap::new();
        for code in DEFAULT_SUPPORTED {
            rates.insert(code.to_string(), 1.0);
        }
        Self {
            canonical_currency: DEFAULT_CANONICAL.to_string(),
            display_currency: Some(DEFAULT_CANONICAL.to_string()),
            rates,
            rates_as_of: None,
        }
    }
}
