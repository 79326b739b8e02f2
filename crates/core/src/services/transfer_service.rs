use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::currency::{normalize_code, CurrencyTable};
use crate::models::ledger::Ledger;
use crate::models::state::UserState;
use crate::models::transaction::{Category, Transaction, TransactionId};
use crate::models::transfer::{ExportDocument, ImportReport, RejectedRecord};
use crate::services::analytics_service::AnalyticsService;
use crate::services::conversion_service::ConversionService;

/// Spreadsheet columns, in export order.
pub const CSV_HEADERS: [&str; 9] = [
    "Date",
    "Item Name",
    "Type",
    "Quantity",
    "Buy Price",
    "Sell Price",
    "Profit/Loss",
    "Profit %",
    "Notes",
];

/// Backup/restore and spreadsheet exchange for the ledger.
///
/// JSON carries canonical amounts verbatim and round-trips exactly. CSV
/// carries display-currency amounts rounded to cents.
pub struct TransferService {
    analytics: AnalyticsService,
    conversion: ConversionService,
}

impl TransferService {
    pub fn new() -> Self {
        Self {
            analytics: AnalyticsService::new(),
            conversion: ConversionService::new(),
        }
    }

    // ── JSON ────────────────────────────────────────────────────────

    pub fn export_json(&self, state: &UserState) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&ExportDocument::backup_of(state))
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger to JSON: {e}")))
    }

    /// Import a JSON document or a bare array of transaction records.
    ///
    /// - A document (`{ "transactions": [...], ... }`) restores: it replaces
    ///   the ledger, and the rate table too when the document carries one.
    /// - A bare array appends to the current ledger.
    ///
    /// Bad records are skipped and listed in the report; `report.replaced`
    /// says whether a document swapped the ledger out. A malformed document
    /// as a whole is an error and leaves `state` untouched.
    pub fn import_json(&self, state: &mut UserState, json: &str) -> Result<ImportReport, CoreError> {
        let value: Value = serde_json::from_str(json)?;

        match value {
            Value::Array(records) => {
                let mut taken: HashSet<TransactionId> =
                    state.ledger.iter().map(|t| t.id.clone()).collect();
                let (accepted, report) = Self::parse_records(&records, &mut taken);
                for tx in accepted {
                    state.ledger.insert(tx);
                }
                Self::log_report("json", &report);
                Ok(report)
            }
            Value::Object(document) => {
                let records = document
                    .get("transactions")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        CoreError::ValidationError(
                            "Import document has no 'transactions' array".into(),
                        )
                    })?;
                let table = Self::document_table(&document)?;

                let mut taken = HashSet::new();
                let (accepted, mut report) = Self::parse_records(records, &mut taken);

                if accepted.is_empty() && !records.is_empty() {
                    warn!(
                        rejected = report.rejected_count(),
                        "no usable records in import document; keeping current ledger"
                    );
                    return Ok(report);
                }

                state.ledger = Ledger::from_transactions(accepted);
                if let Some(table) = table {
                    state.currency_table = table;
                }
                report.replaced = true;
                Self::log_report("json", &report);
                Ok(report)
            }
            _ => Err(CoreError::ValidationError(
                "Import must be a JSON object or array".into(),
            )),
        }
    }

    // ── CSV ─────────────────────────────────────────────────────────

    /// Spreadsheet export, amounts in `currency` with two decimals.
    /// Unsold rows leave the sell and profit columns empty.
    pub fn export_csv(&self, state: &UserState, currency: &str) -> Result<String, CoreError> {
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(CSV_HEADERS)?;

        for view in self
            .analytics
            .transaction_views(&state.ledger, &state.currency_table, currency)
        {
            let tx = &view.transaction;
            wtr.write_record([
                tx.date.format("%Y-%m-%d").to_string(),
                tx.item_name.clone(),
                tx.category.to_string(),
                tx.quantity.to_string(),
                format!("{:.2}", view.buy),
                view.sell.map(|v| format!("{v:.2}")).unwrap_or_default(),
                view.profit.map(|v| format!("{v:.2}")).unwrap_or_default(),
                view.profit_percent
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_default(),
                tx.notes.clone(),
            ])?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| CoreError::Serialization(format!("Failed to flush CSV: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Serialization(format!("CSV is not valid UTF-8: {e}")))
    }

    /// Append rows from a spreadsheet whose amounts are in `currency`.
    ///
    /// Columns are located by header name, so both the 9-column layout and
    /// the older one without `Quantity` work; quantity defaults to 1.
    pub fn import_csv(
        &self,
        state: &mut UserState,
        csv_text: &str,
        currency: &str,
    ) -> Result<ImportReport, CoreError> {
        let currency = normalize_code(currency)?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(csv_text.as_bytes());

        let columns = CsvColumns::locate(rdr.headers()?)?;
        let mut report = ImportReport::default();
        let mut accepted = Vec::new();

        for (index, row) in rdr.records().enumerate() {
            let parsed = row
                .map_err(CoreError::from)
                .and_then(|record| columns.parse(&record, index))
                .map(|mut tx| {
                    let table = &state.currency_table;
                    tx.buy_amount_canonical =
                        self.conversion.to_canonical(tx.buy_amount_canonical, &currency, table);
                    tx.sell_amount_canonical = tx
                        .sell_amount_canonical
                        .map(|s| self.conversion.to_canonical(s, &currency, table));
                    tx
                });

            match parsed {
                Ok(tx) => {
                    accepted.push(tx);
                    report.accepted += 1;
                }
                Err(e) => report.rejected.push(RejectedRecord {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        for tx in accepted {
            state.ledger.insert(tx);
        }
        Self::log_report("csv", &report);
        Ok(report)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn parse_records(
        records: &[Value],
        taken: &mut HashSet<TransactionId>,
    ) -> (Vec<Transaction>, ImportReport) {
        let mut report = ImportReport::default();
        let mut accepted = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            match parse_json_record(index, record) {
                Ok(mut tx) => {
                    if !taken.insert(tx.id.clone()) {
                        let fresh = TransactionId::generate();
                        debug!(old = %tx.id, new = %fresh, "duplicate id on import; assigned a fresh one");
                        taken.insert(fresh.clone());
                        tx.id = fresh;
                    }
                    accepted.push(tx);
                    report.accepted += 1;
                }
                Err(e) => report.rejected.push(RejectedRecord {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        (accepted, report)
    }

    /// Rate table of a document: either nested under `currencyTable`, or the
    /// flat legacy shape with `baseCurrency`/`rates` at the top level.
    fn document_table(document: &Map<String, Value>) -> Result<Option<CurrencyTable>, CoreError> {
        let raw = if let Some(nested) = document.get("currencyTable") {
            nested.clone()
        } else if document.contains_key("canonicalCurrency") || document.contains_key("baseCurrency") {
            Value::Object(document.clone())
        } else {
            return Ok(None);
        };

        let table: CurrencyTable = serde_json::from_value(raw)
            .map_err(|e| CoreError::ValidationError(format!("Invalid currency table: {e}")))?;
        normalize_code(table.canonical_currency())?;
        if let Some(display) = table.display_currency() {
            normalize_code(display)?;
        }
        Ok(Some(table))
    }

    fn log_report(format: &str, report: &ImportReport) {
        if report.rejected.is_empty() {
            debug!(format, accepted = report.accepted, "import finished");
        } else {
            warn!(
                format,
                accepted = report.accepted,
                rejected = report.rejected_count(),
                "import skipped invalid records"
            );
        }
    }
}

impl Default for TransferService {
    fn default() -> Self {
        Self::new()
    }
}

// ── Record parsing ──────────────────────────────────────────────────

fn reject(index: usize, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidImportRecord {
        index,
        reason: reason.into(),
    }
}

/// Parse one JSON record. Accepts the export field names and the legacy
/// `buyPriceBase`/`sellPriceBase`/`type` names; amounts are taken as canonical.
fn parse_json_record(index: usize, record: &Value) -> Result<Transaction, CoreError> {
    let obj = record
        .as_object()
        .ok_or_else(|| reject(index, "record is not an object"))?;

    let buy = json_amount(obj, &["buyAmountCanonical", "buyPriceBase"])
        .map_err(|e| reject(index, format!("buy amount: {e}")))?
        .ok_or_else(|| reject(index, "missing buy amount"))?;
    let sell = if obj.contains_key("sellAmountCanonical") {
        json_amount(obj, &["sellAmountCanonical"])
    } else {
        // Legacy records store a held item as a sale price of 0.
        json_amount(obj, &["sellPriceBase"]).map(|s| s.filter(|v| *v != 0.0))
    }
    .map_err(|e| reject(index, format!("sell amount: {e}")))?;

    let date = obj
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| reject(index, "missing date"))
        .and_then(|raw| parse_date(raw).ok_or_else(|| reject(index, format!("invalid date '{raw}'"))))?;

    let quantity = match obj.get("quantity") {
        None | Some(Value::Null) => 1,
        Some(v) => json_quantity(v).ok_or_else(|| reject(index, format!("invalid quantity {v}")))?,
    };

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => TransactionId::from(s.trim()),
        Some(Value::Number(n)) => TransactionId::from(n.to_string()),
        _ => TransactionId::generate(),
    };

    let text = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .unwrap_or("")
            .trim()
            .to_string()
    };

    Ok(Transaction {
        id,
        date,
        item_name: text(&["itemName"]),
        category: Category::parse(&text(&["category", "type"])),
        quantity,
        buy_amount_canonical: buy,
        sell_amount_canonical: sell,
        notes: text(&["notes"]),
    })
}

/// First present amount among `keys`: `Ok(None)` when absent/null/blank.
fn json_amount(obj: &Map<String, Value>, keys: &[&str]) -> Result<Option<f64>, String> {
    let Some(value) = keys.iter().find_map(|k| obj.get(*k)) else {
        return Ok(None);
    };
    let amount = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("unreadable number {n}"))?,
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("not a number: '{s}'"))?,
        other => return Err(format!("not a number: {other}")),
    };
    check_amount(amount).map(Some)
}

fn json_quantity(value: &Value) -> Option<u32> {
    let q = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    to_quantity(q)
}

fn to_quantity(q: f64) -> Option<u32> {
    (q.is_finite() && q >= 1.0 && q.fract() == 0.0 && q <= f64::from(u32::MAX)).then_some(q as u32)
}

fn check_amount(amount: f64) -> Result<f64, String> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(format!("{amount} is not a finite, non-negative number"))
    }
}

/// `YYYY-MM-DD`, or the `DD-Mon-YYYY` form used by the ledger table.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%b-%Y"))
        .ok()
}

/// Spreadsheet cell → amount. Drops currency symbols and thousands separators.
///
/// Only `.` is read as the decimal point. A cell like `1.234,56` is refused
/// rather than misread as 1.23456.
fn cell_amount(raw: &str) -> Result<Option<f64>, String> {
    if let (Some(dot), Some(comma)) = (raw.rfind('.'), raw.rfind(',')) {
        if comma > dot {
            return Err(format!("'{raw}' uses a comma as decimal separator"));
        }
    }
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| format!("not a number: '{raw}'"))?;
    check_amount(amount).map(Some)
}

/// Column positions resolved from a CSV header row.
struct CsvColumns {
    date: usize,
    buy: usize,
    item_name: Option<usize>,
    category: Option<usize>,
    quantity: Option<usize>,
    sell: Option<usize>,
    notes: Option<usize>,
}

impl CsvColumns {
    fn locate(headers: &StringRecord) -> Result<Self, CoreError> {
        let by_name: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let find = |name: &str| by_name.get(name).copied();
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                CoreError::ValidationError(format!("CSV header is missing the '{name}' column"))
            })
        };

        Ok(Self {
            date: require("date")?,
            buy: require("buy price")?,
            item_name: find("item name"),
            category: find("type"),
            quantity: find("quantity"),
            sell: find("sell price"),
            notes: find("notes"),
        })
    }

    fn parse(&self, record: &StringRecord, index: usize) -> Result<Transaction, CoreError> {
        let cell = |col: Option<usize>| col.and_then(|i| record.get(i)).unwrap_or("");

        let raw_date = cell(Some(self.date));
        let date = parse_date(raw_date)
            .ok_or_else(|| reject(index, format!("invalid date '{raw_date}'")))?;
        let buy = cell_amount(cell(Some(self.buy)))
            .map_err(|e| reject(index, format!("buy amount: {e}")))?
            .ok_or_else(|| reject(index, "missing buy amount"))?;
        let sell = cell_amount(cell(self.sell))
            .map_err(|e| reject(index, format!("sell amount: {e}")))?;
        let quantity = match cell(self.quantity) {
            "" => 1,
            raw => raw
                .parse::<f64>()
                .ok()
                .and_then(to_quantity)
                .ok_or_else(|| reject(index, format!("invalid quantity '{raw}'")))?,
        };

        Ok(Transaction {
            id: TransactionId::generate(),
            date,
            item_name: cell(self.item_name).to_string(),
            category: Category::parse(cell(self.category)),
            quantity,
            buy_amount_canonical: buy,
            sell_amount_canonical: sell,
            notes: cell(self.notes).to_string(),
        })
    }
}
