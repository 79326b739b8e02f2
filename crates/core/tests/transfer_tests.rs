// ═══════════════════════════════════════════════════════════════════
// Transfer Tests: JSON backup/restore and CSV spreadsheet exchange
// ═══════════════════════════════════════════════════════════════════

use approx::assert_relative_eq;
use chrono::NaiveDate;
use serde_json::Value;

use tradeledger_core::errors::CoreError;
use tradeledger_core::models::currency::CurrencyTable;
use tradeledger_core::models::state::UserState;
use tradeledger_core::models::transaction::{Category, Transaction, TransactionId};
use tradeledger_core::services::transfer_service::{TransferService, CSV_HEADERS};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tx(id: &str, on: NaiveDate, name: &str, category: Category, buy: f64, sell: Option<f64>) -> Transaction {
    Transaction {
        id: TransactionId::from(id),
        date: on,
        item_name: name.into(),
        category,
        quantity: 1,
        buy_amount_canonical: buy,
        sell_amount_canonical: sell,
        notes: String::new(),
    }
}

/// USD canonical with AUD = 2, holding one sold and one open trade.
fn sample_state() -> UserState {
    let mut state = UserState::default();
    let mut table = CurrencyTable::new("USD").unwrap();
    table.set_rate("AUD", 2.0).unwrap();
    table.set_rate("EUR", 0.92).unwrap();
    table.set_display_currency(Some("AUD")).unwrap();
    table.set_rates_as_of(Some(date(2025, 1, 4)));
    state.currency_table = table;

    let mut sold = tx("t-1", date(2025, 1, 5), "Recoil Case", Category::Case, 10.0, Some(15.0));
    sold.quantity = 2;
    sold.notes = "quick flip".into();
    state.ledger.insert(sold);
    state.ledger.insert(tx("t-2", date(2025, 1, 6), "Katowice 2014", Category::Sticker, 4.0, None));
    state
}

// ═══════════════════════════════════════════════════════════════════
// JSON export
// ═══════════════════════════════════════════════════════════════════

mod json_export {
    use super::*;

    #[test]
    fn document_shape() {
        let json = TransferService::new().export_json(&sample_state()).unwrap();
        let doc: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(doc["version"], 1);
        assert_eq!(doc["currencyTable"]["canonicalCurrency"], "USD");
        assert_eq!(doc["currencyTable"]["displayCurrency"], "AUD");

        let txs = doc["transactions"].as_array().unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0]["id"], "t-1");
        assert_eq!(txs[0]["date"], "2025-01-05");
        assert_eq!(txs[0]["itemName"], "Recoil Case");
        assert_eq!(txs[0]["category"], "Case");
        assert_eq!(txs[0]["quantity"], 2);
        assert_eq!(txs[0]["buyAmountCanonical"], 10.0);
        assert_eq!(txs[0]["sellAmountCanonical"], 15.0);
        assert!(txs[1]["sellAmountCanonical"].is_null());
    }

    #[test]
    fn is_pretty_printed() {
        let json = TransferService::new().export_json(&sample_state()).unwrap();
        assert!(json.contains('\n'));
    }

    #[test]
    fn round_trip_is_exact() {
        let svc = TransferService::new();
        let original = sample_state();
        let json = svc.export_json(&original).unwrap();

        let mut restored = UserState::default();
        let report = svc.import_json(&mut restored, &json).unwrap();

        assert_eq!(report.accepted, 2);
        assert!(report.rejected.is_empty());
        assert_eq!(restored.ledger, original.ledger);
        assert_eq!(restored.currency_table, original.currency_table);
    }
}

// ═══════════════════════════════════════════════════════════════════
// JSON import
// ═══════════════════════════════════════════════════════════════════

mod json_import {
    use super::*;

    #[test]
    fn bare_array_with_one_bad_record() {
        let json = r#"[
            { "date": "2025-02-01", "itemName": "A", "buyAmountCanonical": 1.0 },
            { "date": "2025-02-02", "itemName": "B" },
            { "date": "2025-02-03", "itemName": "C", "buyAmountCanonical": 3.0, "sellAmountCanonical": 4.0 }
        ]"#;
        let mut state = UserState::default();
        let report = TransferService::new().import_json(&mut state, json).unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(report.total(), 3);
        assert_eq!(report.rejected[0].index, 1);
        assert!(report.rejected[0].reason.contains("buy"));

        assert_eq!(state.ledger.len(), 2);
        let ids: Vec<&str> = state.ledger.iter().map(|t| t.id.as_str()).collect();
        assert_ne!(ids[0], ids[1]);
        assert!(ids.iter().all(|id| id.len() == 36));
    }

    #[test]
    fn bare_array_appends() {
        let mut state = sample_state();
        let json = r#"[{ "date": "2025-01-01", "itemName": "Old", "buyAmountCanonical": 2 }]"#;
        TransferService::new().import_json(&mut state, json).unwrap();

        assert_eq!(state.ledger.len(), 3);
        assert_eq!(state.ledger.as_slice()[0].item_name, "Old");
        assert_eq!(state.currency_table, sample_state().currency_table);
    }

    #[test]
    fn colliding_ids_get_fresh_ones() {
        let mut state = sample_state();
        let json = r#"[{ "id": "t-1", "date": "2025-03-01", "itemName": "Dup", "buyAmountCanonical": 1 }]"#;
        TransferService::new().import_json(&mut state, json).unwrap();

        let dup = state.ledger.iter().find(|t| t.item_name == "Dup").unwrap();
        assert_ne!(dup.id.as_str(), "t-1");
        assert_eq!(
            state.ledger.get(&TransactionId::from("t-1")).unwrap().item_name,
            "Recoil Case"
        );
    }

    #[test]
    fn legacy_document_with_aliases() {
        let json = r#"{
            "baseCurrency": "aud",
            "displayCurrency": "USD",
            "rates": { "AUD": 1, "USD": 0.65, "EUR": 0.6 },
            "transactions": [
                { "id": 17, "date": "2024-11-20", "itemName": "Dreams & Nightmares Case",
                  "type": "case", "quantity": "3", "buyPriceBase": "4.50", "sellPriceBase": 6 },
                { "id": "abc", "date": "2024-11-21", "itemName": "M4A1-S | Printstream",
                  "type": "Skin", "buyPriceBase": 120.0, "sellPriceBase": null }
            ]
        }"#;
        let mut state = sample_state();
        let report = TransferService::new().import_json(&mut state, json).unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(state.currency_table.canonical_currency(), "AUD");
        assert_eq!(state.currency_table.display_currency(), Some("USD"));
        assert_eq!(state.currency_table.rate("USD"), Some(0.65));

        let case = state.ledger.get(&TransactionId::from("17")).unwrap();
        assert_eq!(case.category, Category::Case);
        assert_eq!(case.quantity, 3);
        assert_relative_eq!(case.buy_amount_canonical, 4.5);
        assert_eq!(case.sell_amount_canonical, Some(6.0));

        let skin = state.ledger.get(&TransactionId::from("abc")).unwrap();
        assert_eq!(skin.category, Category::Skin);
        assert_eq!(skin.sell_amount_canonical, None);
        assert_eq!(state.ledger.len(), 2);
    }

    #[test]
    fn document_without_table_keeps_current_table() {
        let mut state = sample_state();
        let json = r#"{ "transactions": [
            { "date": "2025-04-01", "itemName": "Only", "buyAmountCanonical": 1 }
        ] }"#;
        TransferService::new().import_json(&mut state, json).unwrap();
        assert_eq!(state.ledger.len(), 1);
        assert_eq!(state.currency_table, sample_state().currency_table);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let json = r#"[{ "date": "2025-02-01", "buyAmountCanonical": 1 }]"#;
        let mut state = UserState::default();
        TransferService::new().import_json(&mut state, json).unwrap();

        let t = &state.ledger.as_slice()[0];
        assert_eq!(t.category, Category::Case);
        assert_eq!(t.quantity, 1);
        assert_eq!(t.item_name, "");
        assert_eq!(t.notes, "");
    }

    #[test]
    fn invalid_records_are_reported_individually() {
        let json = r#"[
            { "date": "not a date", "buyAmountCanonical": 1 },
            { "buyAmountCanonical": 1 },
            { "date": "2025-02-01", "buyAmountCanonical": -1 },
            { "date": "2025-02-01", "buyAmountCanonical": "ten" },
            { "date": "2025-02-01", "buyAmountCanonical": 1, "sellAmountCanonical": -3 },
            { "date": "2025-02-01", "buyAmountCanonical": 1, "quantity": 0 },
            { "date": "2025-02-01", "buyAmountCanonical": 1, "quantity": 1.5 },
            "just a string",
            { "date": "01-Feb-2025", "buyAmountCanonical": 1 }
        ]"#;
        let mut state = UserState::default();
        let report = TransferService::new().import_json(&mut state, json).unwrap();

        assert_eq!(report.accepted, 1);
        let rejected: Vec<usize> = report.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(state.ledger.as_slice()[0].date, date(2025, 2, 1));
    }

    #[test]
    fn all_rejected_document_keeps_ledger() {
        let mut state = sample_state();
        let json = r#"{ "transactions": [ { "itemName": "no buy, no date" } ] }"#;
        let report = TransferService::new().import_json(&mut state, json).unwrap();

        assert_eq!(report.accepted, 0);
        assert_eq!(report.rejected_count(), 1);
        assert!(!report.replaced);
        assert_eq!(state, sample_state());
    }

    #[test]
    fn empty_document_replaces_and_says_so() {
        let mut state = sample_state();
        let json = r#"{
            "currencyTable": { "canonicalCurrency": "EUR", "rates": { "USD": 1.1 } },
            "transactions": []
        }"#;
        let report = TransferService::new().import_json(&mut state, json).unwrap();

        assert_eq!(report.accepted, 0);
        assert!(report.replaced);
        assert!(report.changed_state());
        assert!(state.ledger.is_empty());
        assert_eq!(state.currency_table.canonical_currency(), "EUR");
    }

    #[test]
    fn bare_array_never_replaces() {
        let mut state = sample_state();
        let report = TransferService::new().import_json(&mut state, "[]").unwrap();
        assert!(!report.replaced);
        assert!(!report.changed_state());
        assert_eq!(state, sample_state());
    }

    #[test]
    fn legacy_zero_sell_price_means_unsold() {
        let json = r#"{
            "baseCurrency": "USD",
            "rates": { "USD": 1 },
            "transactions": [
                { "id": "held", "date": "2024-03-01", "itemName": "Clutch Case",
                  "buyPriceBase": 10, "sellPriceBase": 0 },
                { "id": "zero-str", "date": "2024-03-02", "itemName": "Prisma Case",
                  "buyPriceBase": 2, "sellPriceBase": "0" }
            ]
        }"#;
        let mut state = UserState::default();
        TransferService::new().import_json(&mut state, json).unwrap();

        for id in ["held", "zero-str"] {
            let t = state.ledger.get(&TransactionId::from(id)).unwrap();
            assert_eq!(t.sell_amount_canonical, None, "{id}");
            assert!(!t.is_sold());
        }

        let csv = TransferService::new().export_csv(&state, "USD").unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with("10.00,,,,"), "row was {row}");
    }

    #[test]
    fn explicit_zero_sale_is_kept() {
        let json = r#"[{ "id": "gift", "date": "2025-02-01", "buyAmountCanonical": 3,
                          "sellAmountCanonical": 0 }]"#;
        let mut state = UserState::default();
        TransferService::new().import_json(&mut state, json).unwrap();

        let t = state.ledger.get(&TransactionId::from("gift")).unwrap();
        assert_eq!(t.sell_amount_canonical, Some(0.0));
        assert!(t.is_sold());
    }

    #[test]
    fn wrong_document_shapes_are_errors() {
        let svc = TransferService::new();
        for json in ["42", r#""text""#, r#"{ "version": 1 }"#, r#"{ "transactions": {} }"#] {
            let mut state = sample_state();
            let result = svc.import_json(&mut state, json);
            assert!(
                matches!(result, Err(CoreError::ValidationError(_))),
                "expected ValidationError for {json}"
            );
            assert_eq!(state, sample_state());
        }
    }

    #[test]
    fn bad_table_is_an_error() {
        let mut state = sample_state();
        let json = r#"{ "currencyTable": { "canonicalCurrency": "DOLLARS" }, "transactions": [] }"#;
        let result = TransferService::new().import_json(&mut state, json);
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert_eq!(state, sample_state());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut state = UserState::default();
        let result = TransferService::new().import_json(&mut state, "{ not json");
        assert!(matches!(result, Err(CoreError::Deserialization(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// CSV export
// ═══════════════════════════════════════════════════════════════════

mod csv_export {
    use super::*;

    #[test]
    fn rows_in_display_currency() {
        let csv = TransferService::new().export_csv(&sample_state(), "AUD").unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "2025-01-05,Recoil Case,Case,2,20.00,30.00,10.00,50.00,quick flip"
        );
        assert_eq!(lines[2], "2025-01-06,Katowice 2014,Sticker,1,8.00,,,,");
    }

    #[test]
    fn quotes_fields_with_commas() {
        let mut state = UserState::default();
        state.ledger.insert(tx(
            "q",
            date(2025, 1, 1),
            "Sticker | Team, Holo",
            Category::Sticker,
            1.0,
            None,
        ));
        let csv = TransferService::new().export_csv(&state, "USD").unwrap();
        assert!(csv.contains("\"Sticker | Team, Holo\""));
    }

    #[test]
    fn empty_ledger_has_only_header() {
        let csv = TransferService::new().export_csv(&UserState::default(), "USD").unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// CSV import
// ═══════════════════════════════════════════════════════════════════

mod csv_import {
    use super::*;

    #[test]
    fn with_quantity_column() {
        let csv = "\
Date,Item Name,Type,Quantity,Buy Price,Sell Price,Profit/Loss,Profit %,Notes
2025-01-05,Recoil Case,Case,2,20.00,30.00,10.00,50.00,quick flip
2025-01-06,Katowice 2014,Sticker,1,8.00,,,,
";
        let mut state = sample_state();
        let before = state.ledger.len();
        let report = TransferService::new().import_csv(&mut state, csv, "AUD").unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(state.ledger.len(), before + 2);

        let imported: Vec<&Transaction> = state
            .ledger
            .iter()
            .filter(|t| !t.id.as_str().starts_with("t-"))
            .collect();
        assert_eq!(imported[0].quantity, 2);
        assert_relative_eq!(imported[0].buy_amount_canonical, 10.0);
        assert_relative_eq!(imported[0].sell_amount_canonical.unwrap(), 15.0);
        assert_eq!(imported[0].notes, "quick flip");
        assert_eq!(imported[1].category, Category::Sticker);
        assert_eq!(imported[1].sell_amount_canonical, None);
    }

    #[test]
    fn without_quantity_column() {
        let csv = "\
date,item name,type,buy price,sell price,profit/loss,profit %,notes
05-Jan-2025,Glove Case,Case,3.50,4.00,0.50,14.29,
";
        let mut state = UserState::default();
        let report = TransferService::new().import_csv(&mut state, csv, "USD").unwrap();

        assert_eq!(report.accepted, 1);
        let t = &state.ledger.as_slice()[0];
        assert_eq!(t.date, date(2025, 1, 5));
        assert_eq!(t.quantity, 1);
        assert_relative_eq!(t.buy_amount_canonical, 3.5);
        assert_relative_eq!(t.sell_amount_canonical.unwrap(), 4.0);
    }

    #[test]
    fn amounts_with_symbols_and_separators() {
        let csv = "\
Date,Item Name,Type,Buy Price,Sell Price
2025-01-05,Karambit | Doppler,Skin,\"$1,234.50\",
";
        let mut state = UserState::default();
        TransferService::new().import_csv(&mut state, csv, "USD").unwrap();
        assert_relative_eq!(state.ledger.as_slice()[0].buy_amount_canonical, 1234.5);
    }

    #[test]
    fn comma_decimal_cells_are_rejected() {
        let csv = "\
Date,Item Name,Type,Buy Price,Sell Price
2025-01-05,Glove Case,Case,\"1.234,56\",
2025-01-05,Shadow Case,Case,\"1,234.56\",
";
        let mut state = UserState::default();
        let report = TransferService::new().import_csv(&mut state, csv, "USD").unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected[0].index, 0);
        assert!(report.rejected[0].reason.contains("decimal"));
        assert_relative_eq!(state.ledger.as_slice()[0].buy_amount_canonical, 1234.56);
    }

    #[test]
    fn bad_rows_are_rejected_individually() {
        let csv = "\
Date,Item Name,Type,Quantity,Buy Price,Sell Price
2025-01-05,Good,Case,1,1.00,
yesterday,Bad date,Case,1,1.00,
2025-01-05,No buy,Case,1,,
2025-01-05,Zero qty,Case,0,1.00,
2025-01-05,Negative sell,Case,1,1.00,-2
";
        let mut state = UserState::default();
        let report = TransferService::new().import_csv(&mut state, csv, "USD").unwrap();

        assert_eq!(report.accepted, 1);
        let rejected: Vec<usize> = report.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![1, 2, 3, 4]);
        assert_eq!(state.ledger.len(), 1);
    }

    #[test]
    fn missing_required_header_is_an_error() {
        let csv = "Item Name,Buy Price\nCase,1.00\n";
        let mut state = UserState::default();
        let result = TransferService::new().import_csv(&mut state, csv, "USD");
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn malformed_currency_is_an_error() {
        let mut state = UserState::default();
        let result = TransferService::new().import_csv(&mut state, "Date,Buy Price\n", "XX");
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn export_then_import_in_canonical() {
        let svc = TransferService::new();
        let original = sample_state();
        let csv = svc.export_csv(&original, "USD").unwrap();

        let mut copy = UserState {
            currency_table: original.currency_table.clone(),
            ..UserState::default()
        };
        let report = svc.import_csv(&mut copy, &csv, "USD").unwrap();
        assert_eq!(report.accepted, original.ledger.len());

        for (a, b) in original.ledger.iter().zip(copy.ledger.iter()) {
            assert_eq!(a.date, b.date);
            assert_eq!(a.item_name, b.item_name);
            assert_eq!(a.category, b.category);
            assert_eq!(a.quantity, b.quantity);
            assert_relative_eq!(a.buy_amount_canonical, b.buy_amount_canonical);
            assert_eq!(a.sell_amount_canonical, b.sell_amount_canonical);
        }
    }
}
