//! Inventory store over the SQLite backing file.
//!
//! Reads go straight to the pool. Every write goes through [`InventoryStore::persist`],
//! which serializes writers with an in-process mutex and an `IMMEDIATE` transaction,
//! so a load-check-write sequence can never interleave with another one.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::core::error::{AppError, AppResult, StockShortfall};
use crate::core::types::{positive_quantity, Condition, InventoryItem, ItemId, NewInventoryItem, PaymentMethod};
use crate::storage::db::{create_pool, DbPool};
use crate::storage::sales::{self, conversion_error, SaleLine, SaleRecord};

const ITEM_COLUMNS: &str = "id, artist, title, genre, style, label, format, condition, price, quantity, catalog_id";

/// Totals shown by /stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryStats {
    /// Records with at least one copy on hand
    pub records: u64,
    /// Copies on hand across all records
    pub total_quantity: u64,
    /// Completed sales in the log
    pub sales: u64,
}

/// Shared handle to the inventory and sales log.
pub struct InventoryStore {
    pool: Arc<DbPool>,
    write_lock: Mutex<()>,
}

fn parse_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<InventoryItem> {
    let condition: String = row.get(7)?;
    let price: String = row.get(8)?;
    let quantity: i64 = row.get(9)?;
    let catalog_id: Option<i64> = row.get(10)?;
    Ok(InventoryItem {
        id: ItemId(row.get(0)?),
        artist: row.get(1)?,
        title: row.get(2)?,
        genre: row.get(3)?,
        style: row.get(4)?,
        label: row.get(5)?,
        format: row.get(6)?,
        condition: Condition::from_str(&condition).map_err(|e| conversion_error(7, e))?,
        price: Decimal::from_str(&price).map_err(|e| conversion_error(8, e))?,
        quantity: u32::try_from(quantity).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(9, quantity))?,
        catalog_id: catalog_id.and_then(|id| u64::try_from(id).ok()),
    })
}

fn find_in(conn: &Connection, id: ItemId) -> AppResult<Option<InventoryItem>> {
    let sql = format!("SELECT {} FROM inventory WHERE id = ?1", ITEM_COLUMNS);
    Ok(conn.query_row(&sql, params![id.0], parse_item).optional()?)
}

/// Read-check-write of one quantity. Only called with a write transaction open.
fn apply_delta_in(conn: &Connection, id: ItemId, delta: i64) -> AppResult<InventoryItem> {
    let mut item = find_in(conn, id)?.ok_or(AppError::NotFound(id))?;
    let shortfall = || AppError::InsufficientStock {
        item_id: id,
        requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
        available: item.quantity,
    };
    let updated = match i64::from(item.quantity).checked_add(delta) {
        Some(updated) if updated < 0 => return Err(shortfall()),
        Some(updated) => updated,
        None if delta < 0 => return Err(shortfall()),
        None => return Err(AppError::InvalidQuantity(delta.to_string())),
    };
    let updated = u32::try_from(updated).map_err(|_| AppError::InvalidQuantity(updated.to_string()))?;

    conn.execute(
        "UPDATE inventory SET quantity = ?1 WHERE id = ?2",
        params![updated, id.0],
    )?;
    item.quantity = updated;
    Ok(item)
}

impl InventoryStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: &str) -> AppResult<Self> {
        Ok(Self::new(Arc::new(create_pool(path)?)))
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }

    /// Runs `f` inside the single writer scope.
    ///
    /// The write mutex and an `IMMEDIATE` transaction are held for the duration of `f`.
    /// The transaction commits only if `f` succeeds; any error (or panic) drops it,
    /// which rolls back, and the guard is released on every path.
    pub fn persist<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T>,
    {
        // Writers are serialized by the transaction as well, so a poisoned guard is still sound
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Inventory write lock was poisoned, recovering...");
                poisoned.into_inner()
            }
        };

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Looks up one record, sold out or not.
    pub fn find(&self, id: ItemId) -> AppResult<InventoryItem> {
        let conn = self.pool.get()?;
        find_in(&conn, id)?.ok_or(AppError::NotFound(id))
    }

    /// Case-insensitive substring match over artist and title, in-stock records only.
    ///
    /// Matching happens here rather than in SQL because SQLite's `LOWER` only folds ASCII.
    pub fn search(&self, text: &str) -> AppResult<Vec<InventoryItem>> {
        let needle = text.trim().to_lowercase();
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM inventory WHERE quantity > 0 ORDER BY artist, title, condition",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map([], parse_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items
            .into_iter()
            .filter(|item| {
                needle.is_empty()
                    || item.artist.to_lowercase().contains(&needle)
                    || item.title.to_lowercase().contains(&needle)
                    || item.display_name().to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// One page of in-stock records in shelf order.
    pub fn list_in_stock(&self, offset: u32, limit: u32) -> AppResult<Vec<InventoryItem>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM inventory WHERE quantity > 0
             ORDER BY artist, title, condition, id LIMIT ?1 OFFSET ?2",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![limit, offset], parse_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn count_in_stock(&self) -> AppResult<u32> {
        let conn = self.pool.get()?;
        let count: u32 = conn.query_row("SELECT COUNT(*) FROM inventory WHERE quantity > 0", [], |row| row.get(0))?;
        Ok(count)
    }

    /// In-stock records with `quantity <= threshold`, scarcest first.
    pub fn low_stock(&self, threshold: u32) -> AppResult<Vec<InventoryItem>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM inventory WHERE quantity > 0 AND quantity <= ?1
             ORDER BY quantity ASC, artist, title",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![threshold], parse_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn stats(&self) -> AppResult<InventoryStats> {
        let conn = self.pool.get()?;
        let (records, total_quantity): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(quantity), 0) FROM inventory WHERE quantity > 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(InventoryStats {
            records: records.max(0) as u64,
            total_quantity: total_quantity.max(0) as u64,
            sales: sales::count_sales(&conn)?,
        })
    }

    /// Inserts a new record row.
    pub fn add_item(&self, new: NewInventoryItem) -> AppResult<InventoryItem> {
        let quantity = positive_quantity(new.quantity)?;
        if new.price.is_sign_negative() {
            return Err(AppError::Validation("Price cannot be negative".to_string()));
        }
        if new.title.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
        let condition = new
            .condition
            .ok_or_else(|| AppError::Validation("Condition is required".to_string()))?;
        let price = new.price.round_dp(2);

        let item = self.persist(|tx| {
            tx.execute(
                "INSERT INTO inventory (artist, title, genre, style, label, format, condition, price, quantity, catalog_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    new.artist.trim(),
                    new.title.trim(),
                    new.genre,
                    new.style,
                    new.label,
                    new.format,
                    condition.code(),
                    price.to_string(),
                    quantity,
                    new.catalog_id.and_then(|id| i64::try_from(id).ok()),
                ],
            )?;
            let id = ItemId(tx.last_insert_rowid());
            find_in(tx, id)?.ok_or(AppError::NotFound(id))
        })?;

        log::info!(
            "Added {} x '{}' ({}) at {} as #{}",
            item.quantity,
            item.display_name(),
            item.condition,
            item.price,
            item.id
        );
        Ok(item)
    }

    /// Changes the quantity on hand by `delta`.
    ///
    /// Fails with `NotFound` for an unknown id and with `InsufficientStock`
    /// when the result would be negative; nothing is written in either case.
    pub fn apply_delta(&self, id: ItemId, delta: i64) -> AppResult<InventoryItem> {
        let item = self.persist(|tx| apply_delta_in(tx, id, delta))?;
        log::info!("Stock of #{} changed by {} to {}", id, delta, item.quantity);
        Ok(item)
    }

    /// Atomically re-validates, decrements and logs a sale.
    ///
    /// Every line is checked against current stock inside the writer scope. If any
    /// line exceeds what is on hand the whole sale is refused with `StockConflict`
    /// listing every short line, and nothing is written.
    pub fn commit_sale(
        &self,
        lines: &[SaleLine],
        payment_method: PaymentMethod,
        sold_at: NaiveDateTime,
    ) -> AppResult<SaleRecord> {
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let record = self.persist(|tx| {
            let mut shortfalls = Vec::new();
            for line in lines {
                let available = find_in(tx, line.item_id)?.map(|item| item.quantity).unwrap_or(0);
                if available < line.quantity {
                    shortfalls.push(StockShortfall {
                        item_id: line.item_id,
                        requested: line.quantity,
                        available,
                    });
                }
            }
            if !shortfalls.is_empty() {
                return Err(AppError::StockConflict(shortfalls));
            }

            for line in lines {
                apply_delta_in(tx, line.item_id, -i64::from(line.quantity))?;
            }
            sales::append_sale(tx, payment_method, sold_at, lines)
        })?;

        log::info!(
            "Sale #{} committed: {} record(s), total {} via {}",
            record.id,
            record.item_count(),
            record.total,
            record.payment_method
        );
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    pub(crate) fn test_store() -> (TempDir, InventoryStore) {
        let dir = TempDir::new().unwrap();
        let store = InventoryStore::open(dir.path().join("inventory.sqlite").to_str().unwrap()).unwrap();
        (dir, store)
    }

    pub(crate) fn record(artist: &str, title: &str, cents: i64, quantity: i64) -> NewInventoryItem {
        NewInventoryItem {
            artist: artist.to_string(),
            title: title.to_string(),
            format: "Vinyl, LP".to_string(),
            condition: Some(Condition::VeryGoodPlus),
            price: Decimal::new(cents, 2),
            quantity,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_find() {
        let (_dir, store) = test_store();
        let added = store.add_item(record("Can", "Tago Mago", 2000, 5)).unwrap();

        let found = store.find(added.id).unwrap();
        assert_eq!(found, added);
        assert_eq!(found.quantity, 5);
        assert_eq!(found.price, Decimal::new(2000, 2));
        assert_eq!(found.display_name(), "Can - Tago Mago");
    }

    #[test]
    fn test_add_rejects_zero_quantity() {
        let (_dir, store) = test_store();
        let err = store.add_item(record("Can", "Ege Bamyasi", 1500, 0)).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity(ref q) if q == "0"));
        assert_eq!(store.count_in_stock().unwrap(), 0);
    }

    #[test]
    fn test_find_unknown_is_not_found() {
        let (_dir, store) = test_store();
        assert!(matches!(store.find(ItemId(404)), Err(AppError::NotFound(ItemId(404)))));
    }

    #[test]
    fn test_search_matches_artist_or_title_case_insensitive() {
        let (_dir, store) = test_store();
        store.add_item(record("Can", "Tago Mago", 2000, 1)).unwrap();
        store.add_item(record("Neu!", "Neu! 75", 2500, 1)).unwrap();
        let sold_out = store.add_item(record("Cluster", "Zuckerzeit", 1800, 1)).unwrap();
        store.apply_delta(sold_out.id, -1).unwrap();

        let hits = store.search("tago").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Tago Mago");

        assert_eq!(store.search("NEU").unwrap().len(), 1);
        assert_eq!(store.search("can - tago").unwrap().len(), 1);
        // sold-out rows stay in the table but never show up
        assert!(store.search("zucker").unwrap().is_empty());
        assert_eq!(store.search("").unwrap().len(), 2);
        assert!(store.search("%").unwrap().is_empty());
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let (_dir, store) = test_store();
        store.add_item(record("Ägyptische Nächte", "Öl", 1500, 1)).unwrap();

        assert_eq!(store.search("ägyptische").unwrap().len(), 1);
        assert_eq!(store.search("ÄGYPTISCHE").unwrap().len(), 1);
        assert_eq!(store.search("öl").unwrap().len(), 1);
        assert_eq!(store.search("nächte - öl").unwrap().len(), 1);
    }

    #[test]
    fn test_apply_delta_never_goes_negative() {
        let (_dir, store) = test_store();
        let item = store.add_item(record("Can", "Tago Mago", 2000, 2)).unwrap();

        let err = store.apply_delta(item.id, -3).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(store.find(item.id).unwrap().quantity, 2);

        assert_eq!(store.apply_delta(item.id, -2).unwrap().quantity, 0);
        assert_eq!(store.apply_delta(item.id, 4).unwrap().quantity, 4);
        assert!(matches!(store.apply_delta(ItemId(999), 1), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_apply_delta_extremes_fail_without_writing() {
        let (_dir, store) = test_store();
        let item = store.add_item(record("Can", "Tago Mago", 2000, 2)).unwrap();

        assert!(matches!(
            store.apply_delta(item.id, i64::MIN),
            Err(AppError::InsufficientStock {
                requested: u32::MAX,
                available: 2,
                ..
            })
        ));
        assert!(matches!(store.apply_delta(item.id, i64::MAX), Err(AppError::InvalidQuantity(_))));
        assert!(matches!(
            store.apply_delta(item.id, i64::from(u32::MAX)),
            Err(AppError::InvalidQuantity(_))
        ));
        assert_eq!(store.find(item.id).unwrap().quantity, 2);
    }

    #[test]
    fn test_paging_low_stock_and_stats() {
        let (_dir, store) = test_store();
        store.add_item(record("A", "One", 1000, 1)).unwrap();
        store.add_item(record("B", "Two", 1000, 3)).unwrap();
        store.add_item(record("C", "Three", 1000, 1)).unwrap();

        let first = store.list_in_stock(0, 2).unwrap();
        let second = store.list_in_stock(2, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].artist, "C");

        let low = store.low_stock(1).unwrap();
        assert_eq!(low.iter().map(|i| i.artist.as_str()).collect::<Vec<_>>(), vec!["A", "C"]);

        assert_eq!(
            store.stats().unwrap(),
            InventoryStats {
                records: 3,
                total_quantity: 5,
                sales: 0
            }
        );
    }

    #[test]
    fn test_persist_rolls_back_on_error() {
        let (_dir, store) = test_store();
        let item = store.add_item(record("Can", "Tago Mago", 2000, 5)).unwrap();

        let result: AppResult<()> = store.persist(|tx| {
            apply_delta_in(tx, item.id, -5)?;
            Err(AppError::Validation("abort".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.find(item.id).unwrap().quantity, 5);
    }
}
