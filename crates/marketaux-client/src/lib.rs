//! Secondary news provider (Marketaux)
//!
//! Keyed by comma-separated symbols. A missing API token is an explicit
//! error, never a silent empty result.

use std::time::Duration;

use analysis_core::{FetchError, NewsArticle, RateLimiter};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const BASE_URL: &str = "https://api.marketaux.com";
const API_KEY_VAR: &str = "MARKETAUX_API_KEY";
const MAX_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct MarketauxClient {
    api_token: Option<String>,
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl MarketauxClient {
    pub fn new(api_token: Option<String>, limiter: RateLimiter) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_token,
            client,
            base_url: BASE_URL.to_string(),
            limiter,
        }
    }

    /// Point the client at a different base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// News for one or more symbols (comma-separated, e.g. `"AAPL,TSLA"`).
    pub async fn get_news(
        &self,
        symbols: &str,
        limit: u32,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        let token = self
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(FetchError::MissingApiKey(API_KEY_VAR))?;

        self.limiter.acquire().await;

        let url = format!("{}/v1/news/all", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_token", token),
                ("symbols", symbols),
                ("limit", &limit.min(MAX_LIMIT).to_string()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(format!("HTTP {status}")));
        }

        let body: NewsEnvelope = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(body
            .data
            .into_iter()
            .map(|item| NewsArticle {
                title: item.title,
                source: item.source,
                published_at: item
                    .published_at
                    .as_deref()
                    .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                url: item.url,
                summary: item.description,
                sentiment: item
                    .entities
                    .first()
                    .and_then(|e| e.sentiment_score)
                    .map(|s| {
                        if s > 0.15 {
                            "positive".to_string()
                        } else if s < -0.15 {
                            "negative".to_string()
                        } else {
                            "neutral".to_string()
                        }
                    }),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct NewsEnvelope {
    #[serde(default)]
    data: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    sentiment_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration as StdDuration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn limiter() -> RateLimiter {
        RateLimiter::new(1000, StdDuration::from_secs(60))
    }

    #[tokio::test]
    async fn missing_token_is_an_explicit_error() {
        let client = MarketauxClient::new(None, limiter());
        let err = client.get_news("AAPL", 10).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingApiKey("MARKETAUX_API_KEY")));
    }

    #[tokio::test]
    async fn limit_is_capped_at_fifty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/news/all"))
            .and(query_param("limit", "50"))
            .and(query_param("symbols", "AAPL,TSLA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = MarketauxClient::new(Some("tok".to_string()), limiter())
            .with_base_url(server.uri());
        let news = client.get_news("AAPL,TSLA", 200).await.unwrap();
        assert!(news.is_empty());
    }

    #[tokio::test]
    async fn sentiment_buckets_from_entity_score() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/news/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "title": "Strong quarter",
                    "published_at": "2026-08-20T12:00:00+00:00",
                    "entities": [{"sentiment_score": 0.6}]
                }]
            })))
            .mount(&server)
            .await;

        let client = MarketauxClient::new(Some("tok".to_string()), limiter())
            .with_base_url(server.uri());
        let news = client.get_news("AAPL", 10).await.unwrap();
        assert_eq!(news[0].sentiment.as_deref(), Some("positive"));
        assert!(news[0].published_at.is_some());
    }
}
