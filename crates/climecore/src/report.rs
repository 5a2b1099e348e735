//! Daily sales report.
//!
//! A report is derived from the sales log on demand and never stored as state:
//! [`generate`] reads one calendar day, [`write_csv`] renders it to
//! `sales_report_YYYY-MM-DD.csv`. Both are deterministic for an unchanged log.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fs_err as fs;
use rust_decimal::Decimal;
use serde::Serialize;
use strum::IntoEnumIterator;
use tempfile::NamedTempFile;

use crate::core::error::AppResult;
use crate::core::types::{format_money, PaymentMethod};
use crate::storage::sales::{self, SaleRecord, DATE_FORMAT};

const HEADER: [&str; 10] = [
    "Date",
    "Time",
    "Sale",
    "Artist",
    "Title",
    "Condition",
    "Quantity",
    "Unit Price",
    "Line Total",
    "Payment Method",
];

/// Totals for one payment method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentGroup {
    pub method: PaymentMethod,
    pub sale_count: u32,
    pub item_count: u32,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    /// One group per payment method, cash first, present even when empty
    pub groups: Vec<PaymentGroup>,
    pub item_count: u32,
    pub grand_total: Decimal,
    pub sales: Vec<SaleRecord>,
}

impl DailyReport {
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    pub fn group(&self, method: PaymentMethod) -> Option<&PaymentGroup> {
        self.groups.iter().find(|g| g.method == method)
    }

    pub fn file_name(&self) -> String {
        report_file_name(self.date)
    }

    /// Chat summary with one line per payment method and the grand total.
    pub fn summary_text(&self) -> String {
        let mut text = format!("📅 Sales Report for {}\n", self.date.format(DATE_FORMAT));
        for group in &self.groups {
            let icon = match group.method {
                PaymentMethod::Cash => "💵",
                PaymentMethod::Pos => "💳",
            };
            text.push_str(&format!(
                "{} {}: {} ({} sale(s), {} record(s))\n",
                icon,
                group.method.label(),
                format_money(group.amount),
                group.sale_count,
                group.item_count
            ));
        }
        text.push_str(&format!("📦 Total: {}", format_money(self.grand_total)));
        text
    }
}

pub fn report_file_name(date: NaiveDate) -> String {
    format!("sales_report_{}.csv", date.format(DATE_FORMAT))
}

/// Groups the sales of one day by payment method. Pure.
pub fn aggregate(date: NaiveDate, sales: Vec<SaleRecord>) -> DailyReport {
    let groups: Vec<PaymentGroup> = PaymentMethod::iter()
        .map(|method| {
            let of_method = sales.iter().filter(|s| s.payment_method == method);
            PaymentGroup {
                method,
                sale_count: of_method.clone().count() as u32,
                item_count: of_method.clone().map(SaleRecord::item_count).sum(),
                amount: of_method.map(|s| s.total).sum(),
            }
        })
        .collect();

    DailyReport {
        date,
        item_count: groups.iter().map(|g| g.item_count).sum(),
        grand_total: groups.iter().map(|g| g.amount).sum(),
        groups,
        sales,
    }
}

/// Reads the sales log for `date` (local calendar day) and aggregates it.
pub fn generate(conn: &rusqlite::Connection, date: NaiveDate) -> AppResult<DailyReport> {
    let sales = sales::sales_on(conn, date)?;
    let report = aggregate(date, sales);
    log::info!(
        "Report for {}: {} sale(s), total {}",
        date,
        report.sales.len(),
        report.grand_total
    );
    Ok(report)
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Writes the report into `dir`, replacing an earlier file for the same day.
///
/// The rows go to a temporary file in `dir` that is renamed over the target,
/// so a reader never sees a half-written report.
pub fn write_csv(report: &DailyReport, dir: &Path) -> AppResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(report.file_name());

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_rows(report, tmp.as_file_mut())?;
    tmp.persist(&path).map_err(|e| e.error)?;

    log::info!("Report written to {}", path.display());
    Ok(path)
}

fn write_rows(report: &DailyReport, out: &mut std::fs::File) -> AppResult<()> {
    let date = report.date.format(DATE_FORMAT).to_string();

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;

    for group in &report.groups {
        let label = group.method.label();
        for sale in report.sales.iter().filter(|s| s.payment_method == group.method) {
            let time = sale.sold_at.format("%H:%M:%S").to_string();
            let sale_id = sale.id.to_string();
            for line in &sale.lines {
                let condition = line.condition.to_string();
                let quantity = line.quantity.to_string();
                let unit_price = money(line.unit_price);
                let line_total = money(line.line_total());
                writer.write_record([
                    date.as_str(),
                    time.as_str(),
                    sale_id.as_str(),
                    line.artist.as_str(),
                    line.title.as_str(),
                    condition.as_str(),
                    quantity.as_str(),
                    unit_price.as_str(),
                    line_total.as_str(),
                    label,
                ])?;
            }
        }
        let items = group.item_count.to_string();
        let amount = money(group.amount);
        writer.write_record([
            date.as_str(),
            "",
            "",
            "Subtotal",
            label,
            "",
            items.as_str(),
            "",
            amount.as_str(),
            label,
        ])?;
    }

    let items = report.item_count.to_string();
    let amount = money(report.grand_total);
    writer.write_record([
        date.as_str(),
        "",
        "",
        "Total",
        "",
        "",
        items.as_str(),
        "",
        amount.as_str(),
        "",
    ])?;
    writer.flush()?;
    Ok(())
}
