//! Ticker resolution and quote parsing against a mocked quote API

use std::time::Duration;

use analysis_core::RateLimiter;
use market_data::MarketDataClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn limiter() -> RateLimiter {
    RateLimiter::new(1000, Duration::from_secs(60))
}

#[tokio::test]
async fn resolves_to_canonical_symbol() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteResponse": {
                "result": [
                    {"symbol": "INFY.NS", "regularMarketPrice": 1520.5}
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = MarketDataClient::new(limiter()).with_base_url(server.uri());
    assert_eq!(client.resolve_ticker("  infy.ns ").await, "INFY.NS");
}

#[tokio::test]
async fn resolution_failure_returns_uppercased_input() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/quote"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = MarketDataClient::new(limiter()).with_base_url(server.uri());
    assert_eq!(client.resolve_ticker(" aapl ").await, "AAPL");
}

#[tokio::test]
async fn resolution_survives_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let client = MarketDataClient::new(limiter()).with_base_url(server.uri());
    assert_eq!(client.resolve_ticker("msft").await, "MSFT");
}

#[tokio::test]
async fn key_ratios_derive_fcf_ratios_only_with_positive_fcf() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteResponse": {
                "result": [{
                    "symbol": "AAPL",
                    "longName": "Apple Inc.",
                    "trailingPE": 28.5,
                    "currentRatio": 1.2,
                    "marketCap": 3000.0,
                    "totalDebt": 100.0,
                    "freeCashflow": -5.0
                }]
            }
        })))
        .mount(&server)
        .await;

    let client = MarketDataClient::new(limiter()).with_base_url(server.uri());
    let ratios = client.get_key_ratios("AAPL").await.unwrap();

    assert_eq!(ratios.pe_ratio, Some(28.5));
    assert_eq!(ratios.current_ratio, Some(1.2));
    // Negative FCF: derived ratios must stay absent
    assert!(ratios.price_to_fcf.is_none());
    assert!(ratios.debt_to_fcf.is_none());
}

#[tokio::test]
async fn news_parses_search_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/finance/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "news": [
                {"title": "Apple beats estimates", "publisher": "Newswire",
                 "providerPublishTime": 1724630400, "link": "https://example.com/a"},
                {"no_title": true}
            ]
        })))
        .mount(&server)
        .await;

    let client = MarketDataClient::new(limiter()).with_base_url(server.uri());
    let news = client.get_news("AAPL", 10).await.unwrap();

    assert_eq!(news.len(), 1);
    assert_eq!(news[0].title, "Apple beats estimates");
    assert!(news[0].published_at.is_some());
}
