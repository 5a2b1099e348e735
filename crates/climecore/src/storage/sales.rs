//! Append-only sales log.
//!
//! One `sales` row per completed checkout, one `sale_lines` row per record sold.
//! Rows are only ever inserted; nothing in the crate updates or deletes them.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::error::AppResult;
use crate::core::types::{display_name, Condition, ItemId, PaymentMethod};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A record sold as part of a sale, priced as it was in the cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleLine {
    pub item_id: ItemId,
    pub artist: String,
    pub title: String,
    pub condition: Condition,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl SaleLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn display_name(&self) -> String {
        display_name(&self.artist, &self.title)
    }
}

/// An immutable completed sale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    pub id: i64,
    pub sold_at: NaiveDateTime,
    pub payment_method: PaymentMethod,
    pub lines: Vec<SaleLine>,
    pub total: Decimal,
}

impl SaleRecord {
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

pub fn sum_lines(lines: &[SaleLine]) -> Decimal {
    lines.iter().map(SaleLine::line_total).sum()
}

/// Appends one sale with its lines. Callers run this inside the store's write transaction.
pub fn append_sale(
    conn: &Connection,
    payment_method: PaymentMethod,
    sold_at: NaiveDateTime,
    lines: &[SaleLine],
) -> AppResult<SaleRecord> {
    let total = sum_lines(lines);

    conn.execute(
        "INSERT INTO sales (sold_at, sale_date, payment_method, total) VALUES (?1, ?2, ?3, ?4)",
        params![
            sold_at.format(TIMESTAMP_FORMAT).to_string(),
            sold_at.date().format(DATE_FORMAT).to_string(),
            payment_method.as_ref(),
            total.to_string(),
        ],
    )?;
    let sale_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare(
        "INSERT INTO sale_lines (sale_id, item_id, artist, title, condition, quantity, unit_price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for line in lines {
        stmt.execute(params![
            sale_id,
            line.item_id.0,
            line.artist,
            line.title,
            line.condition.code(),
            line.quantity,
            line.unit_price.to_string(),
        ])?;
    }

    Ok(SaleRecord {
        id: sale_id,
        sold_at,
        payment_method,
        lines: lines.to_vec(),
        total,
    })
}

pub(crate) fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

/// All sales whose local timestamp falls on `date`, oldest first.
pub fn sales_on(conn: &Connection, date: NaiveDate) -> AppResult<Vec<SaleRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, sold_at, payment_method, total FROM sales WHERE sale_date = ?1 ORDER BY sold_at, id",
    )?;
    let headers = stmt
        .query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
            let sold_at: String = row.get(1)?;
            let method: String = row.get(2)?;
            let total: String = row.get(3)?;
            Ok((
                row.get::<_, i64>(0)?,
                NaiveDateTime::parse_from_str(&sold_at, TIMESTAMP_FORMAT).map_err(|e| conversion_error(1, e))?,
                PaymentMethod::from_str(&method).map_err(|e| conversion_error(2, e))?,
                Decimal::from_str(&total).map_err(|e| conversion_error(3, e))?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut line_stmt = conn.prepare(
        "SELECT item_id, artist, title, condition, quantity, unit_price
         FROM sale_lines WHERE sale_id = ?1 ORDER BY id",
    )?;

    let mut sales = Vec::with_capacity(headers.len());
    for (id, sold_at, payment_method, total) in headers {
        let lines = line_stmt
            .query_map(params![id], |row| {
                let condition: String = row.get(3)?;
                let unit_price: String = row.get(5)?;
                Ok(SaleLine {
                    item_id: ItemId(row.get(0)?),
                    artist: row.get(1)?,
                    title: row.get(2)?,
                    condition: Condition::from_str(&condition).map_err(|e| conversion_error(3, e))?,
                    quantity: row.get(4)?,
                    unit_price: Decimal::from_str(&unit_price).map_err(|e| conversion_error(5, e))?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        sales.push(SaleRecord {
            id,
            sold_at,
            payment_method,
            lines,
            total,
        });
    }

    Ok(sales)
}

pub fn count_sales(conn: &Connection) -> AppResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::create_pool;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn line(item: i64, qty: u32, cents: i64) -> SaleLine {
        SaleLine {
            item_id: ItemId(item),
            artist: "Can".to_string(),
            title: "Tago Mago".to_string(),
            condition: Condition::VeryGoodPlus,
            quantity: qty,
            unit_price: Decimal::new(cents, 2),
        }
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_append_and_read_back_by_day() {
        let dir = TempDir::new().unwrap();
        let pool = create_pool(dir.path().join("s.sqlite").to_str().unwrap()).unwrap();
        let conn = pool.get().unwrap();

        let first = append_sale(
            &conn,
            PaymentMethod::Cash,
            at("2024-01-15", "10:00:00"),
            &[line(1, 2, 1000), line(2, 1, 550)],
        )
        .unwrap();
        assert_eq!(first.total, Decimal::new(2550, 2));

        append_sale(&conn, PaymentMethod::Pos, at("2024-01-16", "09:00:00"), &[line(1, 1, 1000)]).unwrap();

        let day = sales_on(&conn, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()).unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0], first);
        assert_eq!(day[0].item_count(), 3);
        assert_eq!(count_sales(&conn).unwrap(), 2);
    }
}
