//! Release lookup against an external music catalog.

pub mod discogs;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};
use crate::core::retry::{retry, RetryConfig};
use crate::core::types::{display_name, split_artist_title, Condition, NewInventoryItem};

pub use discogs::DiscogsClient;

/// Label used when a catalog field is missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Release metadata offered to the user for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    /// Catalog release id; `None` for a manually typed record
    pub external_id: Option<u64>,
    pub artist: String,
    pub title: String,
    pub format: String,
    pub year: Option<String>,
    pub genre: String,
    pub style: String,
    pub label: String,
}

impl CatalogCandidate {
    /// Parses the manual fallback `Artist - Title | Format`.
    ///
    /// The format part is optional and defaults to "Vinyl".
    pub fn manual(input: &str) -> AppResult<Self> {
        let (name, format) = match input.split_once('|') {
            Some((name, format)) => (name, format.trim()),
            None => (input, ""),
        };
        let (artist, title) = split_artist_title(name);
        if title.is_empty() {
            return Err(AppError::Validation(
                "Type the record as: Artist - Title | Format".to_string(),
            ));
        }

        Ok(Self {
            external_id: None,
            artist,
            title,
            format: if format.is_empty() { "Vinyl".to_string() } else { format.to_string() },
            year: None,
            genre: NOT_AVAILABLE.to_string(),
            style: NOT_AVAILABLE.to_string(),
            label: NOT_AVAILABLE.to_string(),
        })
    }

    pub fn display_name(&self) -> String {
        display_name(&self.artist, &self.title)
    }

    /// Inventory row for this release as graded and priced by the shop.
    pub fn to_new_item(&self, condition: Condition, price: Decimal, quantity: i64) -> NewInventoryItem {
        NewInventoryItem {
            artist: self.artist.clone(),
            title: self.title.clone(),
            genre: self.genre.clone(),
            style: self.style.clone(),
            label: self.label.clone(),
            format: self.format.clone(),
            condition: Some(condition),
            price,
            quantity,
            catalog_id: self.external_id,
        }
    }

    /// Button caption, e.g. `Can - Tago Mago [Vinyl, LP] 1971`, cut to `max_chars`.
    pub fn caption(&self, max_chars: usize) -> String {
        let mut text = format!("{} [{}]", self.display_name(), self.format);
        if let Some(year) = &self.year {
            text.push(' ');
            text.push_str(year);
        }
        if text.chars().count() > max_chars {
            text = text.chars().take(max_chars.saturating_sub(1)).collect();
            text.push('…');
        }
        text
    }
}

/// A read-only catalog of releases.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// One page (1-based) of candidates in the catalog's relevance order.
    async fn search(&self, query: &str, page: u32) -> AppResult<Vec<CatalogCandidate>>;

    /// Suggested shop price for a release in the given condition, when the catalog has one.
    async fn price_suggestion(&self, external_id: u64, condition: Condition) -> Option<Decimal>;
}

/// [`CatalogLookup::search`] with the quick retry policy.
pub async fn search_with_retry(
    catalog: &dyn CatalogLookup,
    query: &str,
    page: u32,
) -> AppResult<Vec<CatalogCandidate>> {
    let outcome = retry(&RetryConfig::quick(), || catalog.search(query, page)).await;
    if outcome.is_exhausted() {
        log::warn!(
            "Catalog search '{}' failed after {} attempt(s) in {:?}",
            query,
            outcome.attempts,
            outcome.total_duration
        );
    }
    outcome.into_result()
}
