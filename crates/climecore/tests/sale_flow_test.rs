//! Integration tests for the sale flow against a real database file
//!
//! Run with: cargo test -p climecore --test sale_flow_test

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use climecore::core::error::{AppError, StockShortfall};
use climecore::core::types::{Condition, ItemId, NewInventoryItem, PaymentMethod};
use climecore::storage::SaleLine;
use climecore::{Cart, CartState, InventoryStore};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use tempfile::TempDir;

fn open_store() -> (TempDir, Arc<InventoryStore>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clime.sqlite");
    let store = InventoryStore::open(path.to_str().unwrap()).unwrap();
    (dir, Arc::new(store))
}

fn stock(store: &InventoryStore, artist: &str, title: &str, cents: i64, quantity: i64) -> ItemId {
    store
        .add_item(NewInventoryItem {
            artist: artist.to_string(),
            title: title.to_string(),
            format: "Vinyl, LP".to_string(),
            condition: Some(Condition::VeryGoodPlus),
            price: Decimal::new(cents, 2),
            quantity,
            ..Default::default()
        })
        .unwrap()
        .id
}

fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}

fn jan_15() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

// ============================================================================
// Checkout
// ============================================================================

mod checkout_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_stock_sold_elsewhere_clamps_cart() {
        let (_dir, store) = open_store();
        let a123 = stock(&store, "Can", "Tago Mago", 2000, 5);

        let mut cart = Cart::new();
        cart.add_item(&store, a123, 3).unwrap();
        assert_eq!(cart.total(), Decimal::new(6000, 2));
        cart.begin_checkout(PaymentMethod::Cash).unwrap();

        // another till sells three copies first
        store.apply_delta(a123, -3).unwrap();
        assert_eq!(store.find(a123).unwrap().quantity, 2);

        let err = cart.confirm(&store, at(jan_15(), 12)).await.unwrap_err();
        match err {
            AppError::StockConflict(shortfalls) => assert_eq!(
                shortfalls,
                vec![StockShortfall {
                    item_id: a123,
                    requested: 3,
                    available: 2
                }]
            ),
            other => panic!("expected StockConflict, got {other:?}"),
        }

        assert_eq!(cart.state(), CartState::Building);
        assert_eq!(cart.quantity_of(a123), 2);
        assert_eq!(cart.total(), Decimal::new(4000, 2));
        assert_eq!(store.find(a123).unwrap().quantity, 2);
        assert_eq!(store.stats().unwrap().sales, 0);

        // the clamped cart goes through on the second confirm
        cart.begin_checkout(PaymentMethod::Cash).unwrap();
        let sale = cart.confirm(&store, at(jan_15(), 12)).await.unwrap();
        assert_eq!(sale.total, Decimal::new(4000, 2));
        assert_eq!(store.find(a123).unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_conflict_names_every_short_line_and_writes_nothing() {
        let (_dir, store) = open_store();
        let a = stock(&store, "A", "One", 1000, 2);
        let b = stock(&store, "B", "Two", 1000, 2);
        let c = stock(&store, "C", "Three", 1000, 2);

        let mut cart = Cart::new();
        cart.add_item(&store, a, 2).unwrap();
        cart.add_item(&store, b, 2).unwrap();
        cart.add_item(&store, c, 1).unwrap();
        cart.begin_checkout(PaymentMethod::Pos).unwrap();

        store.apply_delta(a, -1).unwrap();
        store.apply_delta(b, -2).unwrap();

        let err = cart.confirm(&store, at(jan_15(), 9)).await.unwrap_err();
        let AppError::StockConflict(shortfalls) = err else {
            panic!("expected StockConflict");
        };
        let ids: Vec<ItemId> = shortfalls.iter().map(|s| s.item_id).collect();
        assert_eq!(ids, vec![a, b]);

        // untouched line c still has its stock
        assert_eq!(store.find(c).unwrap().quantity, 2);
        assert_eq!(cart.entries().len(), 2);
        assert_eq!(cart.quantity_of(b), 0);
        assert_eq!(cart.quantity_of(a), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_sessions_racing_for_the_same_record() {
        let (_dir, store) = open_store();
        let item = stock(&store, "Neu!", "Neu! 75", 2500, 5);

        let mut carts = Vec::new();
        for _ in 0..2 {
            let mut cart = Cart::new();
            cart.add_item(&store, item, 3).unwrap();
            cart.begin_checkout(PaymentMethod::Cash).unwrap();
            carts.push(cart);
        }

        let handles: Vec<_> = carts
            .into_iter()
            .map(|mut cart| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let result = cart.confirm(&store, at(jan_15(), 15)).await;
                    (result, cart)
                })
            })
            .collect();

        let mut completed = 0;
        let mut conflicts = 0;
        for handle in handles {
            let (result, cart) = handle.await.unwrap();
            match result {
                Ok(sale) => {
                    completed += 1;
                    assert_eq!(cart.state(), CartState::Completed(sale.id));
                }
                Err(AppError::StockConflict(_)) => {
                    conflicts += 1;
                    assert_eq!(cart.state(), CartState::Building);
                    assert_eq!(cart.quantity_of(item), 2);
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!((completed, conflicts), (1, 1));
        assert_eq!(store.find(item).unwrap().quantity, 2);
        assert_eq!(store.stats().unwrap().sales, 1);
    }

    #[test]
    fn test_parallel_commits_never_oversell() {
        let (_dir, store) = open_store();
        let item = stock(&store, "Cluster", "Zuckerzeit", 1800, 5);
        let line = SaleLine {
            item_id: item,
            artist: "Cluster".to_string(),
            title: "Zuckerzeit".to_string(),
            condition: Condition::VeryGoodPlus,
            quantity: 1,
            unit_price: Decimal::new(1800, 2),
        };

        let threads: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                let line = line.clone();
                std::thread::spawn(move || {
                    store
                        .commit_sale(&[line], PaymentMethod::Cash, at(jan_15(), 10 + n))
                        .is_ok()
                })
            })
            .collect();

        let sold = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(sold, 5);
        assert_eq!(store.find(item).unwrap().quantity, 0);
        assert_eq!(store.stats().unwrap().sales, 5);
    }
}

// ============================================================================
// Reports
// ============================================================================

mod report_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use climecore::report;

    async fn sell(store: &InventoryStore, item: ItemId, method: PaymentMethod, when: NaiveDateTime) {
        let mut cart = Cart::new();
        cart.add_item(store, item, 1).unwrap();
        cart.begin_checkout(method).unwrap();
        cart.confirm(store, when).await.unwrap();
    }

    #[tokio::test]
    async fn test_daily_report_from_the_sales_log() {
        let (dir, store) = open_store();
        let ten = stock(&store, "A", "Ten", 1000, 5);
        let fifteen = stock(&store, "B", "Fifteen", 1500, 5);
        let twenty = stock(&store, "C", "Twenty", 2000, 5);
        let twenty_five = stock(&store, "D", "Twenty Five", 2500, 5);
        let thirty = stock(&store, "E", "Thirty", 3000, 5);

        sell(&store, ten, PaymentMethod::Cash, at(jan_15(), 10)).await;
        sell(&store, fifteen, PaymentMethod::Pos, at(jan_15(), 11)).await;
        sell(&store, twenty, PaymentMethod::Cash, at(jan_15(), 12)).await;
        sell(&store, twenty_five, PaymentMethod::Pos, at(jan_15(), 13)).await;
        sell(&store, thirty, PaymentMethod::Cash, at(jan_15(), 14)).await;
        // next day, must not show up
        sell(&store, thirty, PaymentMethod::Cash, at(jan_15().succ_opt().unwrap(), 10)).await;

        let conn = store.pool().get().unwrap();
        let report = report::generate(&conn, jan_15()).unwrap();

        assert_eq!(report.group(PaymentMethod::Cash).unwrap().amount, Decimal::new(6000, 2));
        assert_eq!(report.group(PaymentMethod::Pos).unwrap().amount, Decimal::new(4000, 2));
        assert_eq!(report.grand_total, Decimal::new(10000, 2));
        assert_eq!(report.sales.len(), 5);

        let out = dir.path().join("reports");
        let path = report::write_csv(&report, &out).unwrap();
        let first = std::fs::read(&path).unwrap();

        let again = report::generate(&conn, jan_15()).unwrap();
        assert_eq!(again, report);
        report::write_csv(&again, &out).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }
}
