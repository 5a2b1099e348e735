//! Discogs API client.
//!
//! Only two endpoints are used:
//! - `GET /database/search?type=release` for candidates
//! - `GET /marketplace/price_suggestions/{release_id}` for the suggested price

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::catalog::{CatalogCandidate, CatalogLookup, NOT_AVAILABLE};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{split_artist_title, Condition};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Option<serde_json::Value>,
    #[serde(default)]
    format: Vec<String>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    style: Vec<String>,
    #[serde(default)]
    label: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PriceSuggestion {
    value: f64,
}

fn join_or_na(parts: &[String]) -> String {
    let parts: Vec<&str> = parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        parts.join(", ")
    }
}

impl From<SearchResult> for CatalogCandidate {
    fn from(result: SearchResult) -> Self {
        let (artist, title) = split_artist_title(&result.title);
        let year = match result.year {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() && s != "0" => Some(s),
            Some(serde_json::Value::Number(n)) if n.as_u64().unwrap_or(0) > 0 => Some(n.to_string()),
            _ => None,
        };
        let format = if result.format.is_empty() {
            "Unknown Format".to_string()
        } else {
            result.format.join(", ")
        };

        CatalogCandidate {
            external_id: Some(result.id),
            artist,
            title,
            format,
            year,
            genre: join_or_na(&result.genre),
            style: join_or_na(&result.style),
            label: join_or_na(&result.label),
        }
    }
}

fn unavailable(err: reqwest::Error) -> AppError {
    AppError::CatalogUnavailable(err.without_url().to_string())
}

pub struct DiscogsClient {
    base_url: String,
    token: SecretString,
    page_size: u32,
    http: reqwest::Client,
}

impl DiscogsClient {
    pub fn new(base_url: impl Into<String>, token: SecretString, page_size: u32) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config::catalog::timeout())
            .user_agent(config::catalog::USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            page_size: page_size.max(1),
            http,
        })
    }

    /// Client for `DISCOGS_API_URL` with `CATALOG_PAGE_SIZE` results per page.
    pub fn from_env(token: SecretString) -> AppResult<Self> {
        Self::new(config::catalog::API_URL.as_str(), token, *config::catalog::PAGE_SIZE)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Discogs token={}", self.token.expose_secret()),
            )
    }
}

#[async_trait]
impl CatalogLookup for DiscogsClient {
    async fn search(&self, query: &str, page: u32) -> AppResult<Vec<CatalogCandidate>> {
        let per_page = self.page_size.to_string();
        let page = page.max(1).to_string();
        let response = self
            .get("/database/search")
            .query(&[
                ("q", query),
                ("type", "release"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::CatalogUnavailable(format!("Discogs search returned {}", status)));
        }

        let body: SearchResponse = response.json().await.map_err(unavailable)?;
        log::debug!("Discogs search '{}' page {}: {} result(s)", query, page, body.results.len());
        Ok(body.results.into_iter().map(CatalogCandidate::from).collect())
    }

    async fn price_suggestion(&self, external_id: u64, condition: Condition) -> Option<Decimal> {
        let response = match self
            .get(&format!("/marketplace/price_suggestions/{}", external_id))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                log::debug!("No price suggestion for {}: {}", external_id, response.status());
                return None;
            }
            Err(e) => {
                log::warn!("Price suggestion request for {} failed: {}", external_id, e.without_url());
                return None;
            }
        };

        let suggestions: HashMap<String, PriceSuggestion> = response.json().await.ok()?;
        let value = suggestions.get(condition.full_name())?.value;
        Decimal::from_f64_retain(value).map(|price| price.round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DiscogsClient {
        DiscogsClient::new(server.uri(), SecretString::from("test-token"), 5).unwrap()
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .and(query_param("q", "tago mago"))
            .and(query_param("type", "release"))
            .and(query_param("per_page", "5"))
            .and(query_param("page", "2"))
            .and(header("Authorization", "Discogs token=test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": {"page": 2, "pages": 3},
                "results": [
                    {
                        "id": 1234567,
                        "title": "Can - Tago Mago",
                        "year": "1971",
                        "format": ["Vinyl", "LP", "Album"],
                        "genre": ["Rock", "Electronic"],
                        "style": ["Krautrock"],
                        "label": ["United Artists Records"]
                    },
                    {"id": 42, "title": "Bootleg"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client(&server).search("tago mago", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            CatalogCandidate {
                external_id: Some(1234567),
                artist: "Can".to_string(),
                title: "Tago Mago".to_string(),
                format: "Vinyl, LP, Album".to_string(),
                year: Some("1971".to_string()),
                genre: "Rock, Electronic".to_string(),
                style: "Krautrock".to_string(),
                label: "United Artists Records".to_string(),
            }
        );
        assert_eq!(results[1].artist, "");
        assert_eq!(results[1].format, "Unknown Format");
        assert_eq!(results[1].genre, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_server_error_is_catalog_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).search("anything", 1).await.unwrap_err();
        assert!(matches!(err, AppError::CatalogUnavailable(_)));
        assert!(!err.to_string().contains("test-token"));
    }

    #[tokio::test]
    async fn test_price_suggestion_by_condition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/marketplace/price_suggestions/1234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Very Good Plus (VG+)": {"currency": "USD", "value": 23.45},
                "Mint (M)": {"currency": "USD", "value": 40.0}
            })))
            .mount(&server)
            .await;
        let client = client(&server);

        assert_eq!(
            client.price_suggestion(1234567, Condition::VeryGoodPlus).await,
            Some(Decimal::new(2345, 2))
        );
        assert_eq!(client.price_suggestion(1234567, Condition::Poor).await, None);
        // unknown release: 404 from the mock server
        assert_eq!(client.price_suggestion(1, Condition::Mint).await, None);
    }
}
