use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::currency::{normalize_code, CurrencyTable};
use crate::models::ledger::Ledger;

/// Result of moving the ledger onto a new canonical currency.
///
/// Both halves are built from scratch; the inputs are never touched, so a
/// caller that swaps `table` and `ledger` in together can never expose a
/// half-converted state.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebased {
    pub table: CurrencyTable,
    pub ledger: Ledger,

    /// Multiplier applied to every stored amount (old canonical → new canonical)
    pub factor: f64,

    /// True when the target had no usable rate and `factor` fell back to 1
    pub degraded: bool,
}

/// Re-bases the rate table and every stored amount onto a new canonical currency.
///
/// With `r` the current rates and `N` the target:
/// - `factor = 1 / r[N]`, or 1 when `r[N]` is missing or zero (degraded)
/// - every buy/sell amount is multiplied by `factor`; absent sells stay absent
/// - `new_rates[N] = 1`, `new_rates[c] = r[c] * factor` for every other code
pub struct RebaseService;

impl RebaseService {
    pub fn new() -> Self {
        Self
    }

    pub fn rebase(
        &self,
        table: &CurrencyTable,
        ledger: &Ledger,
        new_base: &str,
    ) -> Result<Rebased, CoreError> {
        let new_base = normalize_code(new_base)?;

        if table.is_canonical(&new_base) {
            debug!(canonical = %new_base, "rebase target is already canonical; nothing to do");
            return Ok(Rebased {
                table: table.clone(),
                ledger: ledger.clone(),
                factor: 1.0,
                degraded: false,
            });
        }

        let (factor, degraded) = match table.rate(&new_base) {
            Some(rate) => (1.0 / rate, false),
            None => {
                warn!(
                    from = %table.canonical_currency(),
                    to = %new_base,
                    "no usable rate for rebase target; keeping stored amounts as they are (factor 1)"
                );
                (1.0, true)
            }
        };

        let new_rates: HashMap<String, f64> = table
            .rates()
            .iter()
            .filter(|(code, _)| **code != new_base)
            .map(|(code, rate)| (code.clone(), rate * factor))
            .collect();

        let new_table = table.rebased(new_base.clone(), new_rates);
        let new_ledger = ledger.map_amounts(|amount| amount * factor);

        debug!(
            from = %table.canonical_currency(),
            to = %new_base,
            factor,
            transactions = new_ledger.len(),
            "ledger rebased"
        );

        Ok(Rebased {
            table: new_table,
            ledger: new_ledger,
            factor,
            degraded,
        })
    }
}

impl Default for RebaseService {
    fn default() -> Self {
        Self::new()
    }
}
