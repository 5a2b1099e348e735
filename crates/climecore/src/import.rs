//! Bulk import of records from a CSV file.
//!
//! Each row is `query,price[,quantity][,condition]`. The first catalog match for
//! `query` is added to the inventory with the given price, quantity (default 1)
//! and condition (default VG+). Bad rows are skipped and logged, not fatal.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use fs_err as fs;

use crate::catalog::{search_with_retry, CatalogLookup};
use crate::core::error::AppResult;
use crate::core::types::{parse_price, parse_quantity, Condition};
use crate::storage::InventoryStore;

const DEFAULT_CONDITION: Condition = Condition::VeryGoodPlus;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: u32,
    pub skipped: u32,
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize) -> Option<&'a str> {
    record.get(idx).map(str::trim).filter(|v| !v.is_empty())
}

fn is_header(record: &csv::StringRecord) -> bool {
    field(record, 0).is_some_and(|f| f.eq_ignore_ascii_case("query"))
        && field(record, 1).is_some_and(|f| f.eq_ignore_ascii_case("price"))
}

/// Imports every row of `reader`. Fails only on unreadable input or a failing database.
pub async fn import_csv<R: Read>(
    reader: R,
    catalog: &dyn CatalogLookup,
    store: &InventoryStore,
) -> AppResult<ImportSummary> {
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    for (idx, record) in rows.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        if row == 1 && is_header(&record) {
            continue;
        }

        let Some(query) = field(&record, 0) else {
            continue;
        };
        let parsed = field(&record, 1)
            .ok_or_else(|| "missing price".to_string())
            .and_then(|p| parse_price(p).map_err(|e| e.user_message()))
            .and_then(|price| {
                let quantity = match field(&record, 2) {
                    Some(q) => parse_quantity(q).map_err(|e| e.user_message())?,
                    None => 1,
                };
                let condition = match field(&record, 3) {
                    Some(c) => Condition::from_str(c).map_err(|_| format!("unknown condition '{}'", c))?,
                    None => DEFAULT_CONDITION,
                };
                Ok((price, quantity, condition))
            });
        let (price, quantity, condition) = match parsed {
            Ok(values) => values,
            Err(reason) => {
                log::warn!("Import row {} ('{}') skipped: {}", row, query, reason);
                summary.skipped += 1;
                continue;
            }
        };

        let candidate = match search_with_retry(catalog, query, 1).await {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                log::warn!("Import row {} ('{}') skipped: {}", row, query, e);
                summary.skipped += 1;
                continue;
            }
        };
        let Some(candidate) = candidate else {
            log::warn!("Import row {} ('{}') skipped: no catalog match", row, query);
            summary.skipped += 1;
            continue;
        };

        store.add_item(candidate.to_new_item(condition, price, i64::from(quantity)))?;
        summary.added += 1;
    }

    log::info!("Import finished: {} added, {} skipped", summary.added, summary.skipped);
    Ok(summary)
}

pub async fn import_file(path: &Path, catalog: &dyn CatalogLookup, store: &InventoryStore) -> AppResult<ImportSummary> {
    let file = fs::File::open(path)?;
    import_csv(file, catalog, store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogCandidate;
    use crate::core::error::AppError;
    use crate::storage::inventory::tests::test_store;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    struct StaticCatalog;

    #[async_trait]
    impl CatalogLookup for StaticCatalog {
        async fn search(&self, query: &str, _page: u32) -> AppResult<Vec<CatalogCandidate>> {
            match query {
                "missing" => Ok(Vec::new()),
                "down" => Err(AppError::Validation("catalog rejected query".into())),
                other => Ok(vec![CatalogCandidate::manual(&format!("{} | Vinyl, LP", other))?]),
            }
        }

        async fn price_suggestion(&self, _external_id: u64, _condition: Condition) -> Option<Decimal> {
            None
        }
    }

    #[tokio::test]
    async fn test_import_rows_with_defaults_and_skips() {
        let (_dir, store) = test_store();
        let input = "\
query,price,quantity,condition
Can - Tago Mago,20,2,nm
Neu! - Neu!,$18.50
missing,10
Cluster - Zuckerzeit,abc
Faust - IV,15,0
down,12
Harmonia - Musik von Harmonia,22,1,mint-ish
";

        let summary = import_csv(input.as_bytes(), &StaticCatalog, &store).await.unwrap();
        assert_eq!(summary, ImportSummary { added: 2, skipped: 5 });

        let tago = store.search("tago").unwrap();
        assert_eq!(tago.len(), 1);
        assert_eq!(tago[0].quantity, 2);
        assert_eq!(tago[0].condition, Condition::NearMint);
        assert_eq!(tago[0].format, "Vinyl, LP");

        let neu = store.search("neu").unwrap();
        assert_eq!(neu[0].quantity, 1);
        assert_eq!(neu[0].condition, Condition::VeryGoodPlus);
        assert_eq!(neu[0].price, Decimal::new(1850, 2));
    }
}
