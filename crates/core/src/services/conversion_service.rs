use tracing::warn;

use crate::errors::CoreError;
use crate::models::currency::CurrencyTable;

/// Converts amounts between the canonical currency and any other code
/// using a `CurrencyTable`.
///
/// The plain methods never fail: a missing or zero rate passes the amount
/// through unchanged and logs a warning, since rate data from upstream may be
/// incomplete. The `try_*` variants report the same condition as
/// `CoreError::MissingRate` for callers that need to know.
pub struct ConversionService;

impl ConversionService {
    pub fn new() -> Self {
        Self
    }

    /// Amount in `from_currency` → canonical: `amount / rates[from]`.
    pub fn to_canonical(&self, amount: f64, from_currency: &str, table: &CurrencyTable) -> f64 {
        self.try_to_canonical(amount, from_currency, table)
            .unwrap_or_else(|e| {
                warn!(error = %e, "passing amount through unconverted");
                amount
            })
    }

    /// Canonical amount → `to_currency`: `amount * rates[to]`.
    pub fn from_canonical(
        &self,
        amount_canonical: f64,
        to_currency: &str,
        table: &CurrencyTable,
    ) -> f64 {
        self.try_from_canonical(amount_canonical, to_currency, table)
            .unwrap_or_else(|e| {
                warn!(error = %e, "passing amount through unconverted");
                amount_canonical
            })
    }

    pub fn try_to_canonical(
        &self,
        amount: f64,
        from_currency: &str,
        table: &CurrencyTable,
    ) -> Result<f64, CoreError> {
        if table.is_canonical(from_currency) {
            return Ok(amount);
        }
        let rate = Self::rate_for(from_currency, table)?;
        Ok(amount / rate)
    }

    pub fn try_from_canonical(
        &self,
        amount_canonical: f64,
        to_currency: &str,
        table: &CurrencyTable,
    ) -> Result<f64, CoreError> {
        if table.is_canonical(to_currency) {
            return Ok(amount_canonical);
        }
        let rate = Self::rate_for(to_currency, table)?;
        Ok(amount_canonical * rate)
    }

    /// Convert between two arbitrary codes, pivoting through canonical.
    ///
    /// Three cases, kept distinct: from canonical (one step), to canonical
    /// (one step), or neither (two steps). Each step has its own pass-through
    /// fallback.
    pub fn convert_between(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        table: &CurrencyTable,
    ) -> f64 {
        if table.is_canonical(from_currency) {
            self.from_canonical(amount, to_currency, table)
        } else if table.is_canonical(to_currency) {
            self.to_canonical(amount, from_currency, table)
        } else {
            let canonical = self.to_canonical(amount, from_currency, table);
            self.from_canonical(canonical, to_currency, table)
        }
    }

    fn rate_for(code: &str, table: &CurrencyTable) -> Result<f64, CoreError> {
        table.rate(code).ok_or_else(|| CoreError::MissingRate {
            currency: code.trim().to_uppercase(),
            canonical: table.canonical_currency().to_string(),
        })
    }
}

impl Default for ConversionService {
    fn default() -> Self {
        Self::new()
    }
}
