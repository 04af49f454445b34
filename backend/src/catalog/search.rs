use log::{debug, info, warn};
use reqwest::Client as HttpClient;
use thiserror::Error;

use super::models::{CatalogProduct, SearchResponse};
use crate::config::CatalogConfig;

const LADDER_DEPTH: usize = 3;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Catalog returned status {0}")]
    StatusError(u16),
}

/// Lazily yields the search terms to try, broadest last: the full query, its
/// first two words, then its first word. Repeats of the previous attempt are skipped.
pub struct SearchLadder<'a> {
    query: &'a str,
    tier: usize,
    last: Option<String>,
}

impl<'a> SearchLadder<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            tier: 0,
            last: None,
        }
    }
}

fn leading_words(query: &str, count: usize) -> String {
    query.split_whitespace().take(count).collect::<Vec<_>>().join(" ")
}

impl Iterator for SearchLadder<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.tier < LADDER_DEPTH {
            let attempt = match self.tier {
                0 => self.query.trim().to_string(),
                1 => leading_words(self.query, 2),
                _ => leading_words(self.query, 1),
            };
            self.tier += 1;

            if attempt.is_empty() || self.last.as_deref() == Some(attempt.as_str()) {
                continue;
            }
            self.last = Some(attempt.clone());
            return Some(attempt);
        }
        None
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    http_client: HttpClient,
    search_url: String,
    page_size: u32,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let http_client = HttpClient::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            search_url: format!(
                "{}/cgi/search.pl",
                config.base_url.as_str().trim_end_matches('/')
            ),
            page_size: config.page_size,
        })
    }

    async fn search_once(&self, terms: &str) -> Result<Vec<CatalogProduct>, CatalogError> {
        let url = format!(
            "{}?search_terms={}&json=1&page_size={}",
            self.search_url,
            urlencoding::encode(terms),
            self.page_size
        );

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::StatusError(response.status().as_u16()));
        }

        let body: SearchResponse = response.json().await?;
        debug!(
            "Catalog search '{}' returned {} products (total {:?})",
            terms,
            body.products.len(),
            body.count
        );
        Ok(body.products)
    }

    /// Walks the search ladder and returns the first non-empty result set.
    /// Failures are logged and never raised; an empty vector means nothing matched.
    pub async fn search(&self, query: &str) -> Vec<CatalogProduct> {
        for (attempt, terms) in SearchLadder::new(query).enumerate() {
            match self.search_once(&terms).await {
                Ok(products) if !products.is_empty() => {
                    info!(
                        "Catalog attempt {} matched {} products for '{}'",
                        attempt + 1,
                        products.len(),
                        terms
                    );
                    return products;
                }
                Ok(_) => debug!("Catalog attempt {} found nothing for '{}'", attempt + 1, terms),
                Err(e) => warn!("Catalog attempt {} for '{}' failed: {}", attempt + 1, terms, e),
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn test_config(base_url: &str) -> CatalogConfig {
        CatalogConfig {
            base_url: Url::parse(base_url).unwrap(),
            page_size: 5,
            user_agent: "nutriscan-test/0.1".into(),
            timeout: Duration::from_secs(5),
        }
    }

    fn products(names: &[&str]) -> serde_json::Value {
        let products: Vec<_> = names
            .iter()
            .map(|name| json!({ "product_name": name }))
            .collect();
        json!({ "count": products.len(), "products": products })
    }

    async fn mount_search(server: &MockServer, terms: &str, body: serde_json::Value, hits: u64) {
        Mock::given(method("GET"))
            .and(path("/cgi/search.pl"))
            .and(query_param("search_terms", terms))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(hits)
            .mount(server)
            .await;
    }

    #[test]
    fn ladder_narrows_to_first_word() {
        let attempts: Vec<String> = SearchLadder::new("Acme Choco Bar Extra Crunchy").collect();
        assert_eq!(attempts, vec!["Acme Choco Bar Extra Crunchy", "Acme Choco", "Acme"]);
    }

    #[test]
    fn ladder_skips_repeated_attempts() {
        assert_eq!(SearchLadder::new("Acme Choco").collect::<Vec<_>>(), vec!["Acme Choco", "Acme"]);
        assert_eq!(SearchLadder::new("unknown").collect::<Vec<_>>(), vec!["unknown"]);
        assert_eq!(SearchLadder::new("   ").count(), 0);
    }

    #[tokio::test]
    async fn stops_at_first_successful_attempt() {
        let server = MockServer::start().await;
        mount_search(&server, "Acme Choco Bar Extra Crunchy", products(&[]), 1).await;
        mount_search(&server, "Acme Choco", products(&["Choco Bar", "Choco Drink"]), 1).await;
        mount_search(&server, "Acme", products(&["Acme Anything"]), 0).await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        let found = client.search("Acme Choco Bar Extra Crunchy").await;

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].product_name.as_deref(), Some("Choco Bar"));
    }

    #[tokio::test]
    async fn failed_attempt_moves_to_next() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("search_terms", "Acme Choco Bar"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("search_terms", "Acme Choco"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&server)
            .await;
        mount_search(&server, "Acme", products(&["Acme Bar"]), 1).await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        let found = client.search("Acme Choco Bar").await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_ladder_returns_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi/search.pl"))
            .and(query_param("json", "1"))
            .and(query_param("page_size", "5"))
            .and(header("user-agent", "nutriscan-test/0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(products(&[])))
            .expect(3)
            .mount(&server)
            .await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        assert!(client.search("Acme Choco Bar").await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_catalog_returns_empty() {
        let client = CatalogClient::new(&test_config("http://127.0.0.1:9")).unwrap();
        assert!(client.search("Acme Choco Bar").await.is_empty());
    }
}
