use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::analytics::{Period, ProfitPoint};
use crate::models::currency::CurrencyTable;
use crate::models::ledger::Ledger;
use crate::services::conversion_service::ConversionService;

/// Generates chart-ready profit series from the ledger.
///
/// The core computes all the numbers; the frontend only renders.
pub struct ChartService {
    conversion: ConversionService,
}

impl ChartService {
    pub fn new() -> Self {
        Self {
            conversion: ConversionService::new(),
        }
    }

    /// Cumulative profit curve over `period`, ending at `today`.
    ///
    /// 1. Keep transactions whose date falls in the period window
    /// 2. Sum each date's net profit (missing sell counts as 0) in canonical
    /// 3. Walk dates ascending, accumulating the running total
    /// 4. Convert each running total to `currency`
    ///
    /// One point per distinct date; empty input yields an empty series.
    pub fn cumulative_profit_series(
        &self,
        ledger: &Ledger,
        period: Period,
        table: &CurrencyTable,
        currency: &str,
        today: NaiveDate,
    ) -> Vec<ProfitPoint> {
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for tx in ledger.iter().filter(|t| period.contains(t.date, today)) {
            *daily.entry(tx.date).or_insert(0.0) += tx.profit_canonical();
        }

        let mut running = 0.0;
        daily
            .into_iter()
            .map(|(date, day_profit)| {
                running += day_profit;
                ProfitPoint {
                    date,
                    cumulative_value: self.conversion.from_canonical(running, currency, table),
                    daily_value: self.conversion.from_canonical(day_profit, currency, table),
                }
            })
            .collect()
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
