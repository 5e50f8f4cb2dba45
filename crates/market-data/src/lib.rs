//! Market-data lookups backed by the public quote API
//!
//! Covers ticker resolution, quote-derived key ratios, and company news.
//! Resolution is best-effort: any lookup failure degrades to the uppercased
//! input instead of failing the caller.

use std::time::Duration;

use analysis_core::{FetchError, KeyRatios, NewsArticle, Quote, RateLimiter, ResolveTicker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

const BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Clone)]
pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl MarketDataClient {
    pub fn new(limiter: RateLimiter) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
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

    async fn get_json(&self, path_and_query: &str) -> Result<Value, FetchError> {
        self.limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path_and_query);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(format!("HTTP {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }

    fn first_quote_result(json: &Value) -> Option<&Value> {
        json.get("quoteResponse")
            .and_then(|v| v.get("result"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
    }

    /// Quote lookup for a symbol; the response carries the canonical symbol.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let json = self
            .get_json(&format!("/v8/finance/quote?symbols={symbol}"))
            .await?;

        let data = Self::first_quote_result(&json)
            .ok_or_else(|| FetchError::Parse(format!("no quote data for {symbol}")))?;

        let canonical = data
            .get("symbol")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Parse("quote without symbol field".to_string()))?;

        Ok(Quote {
            symbol: canonical.to_string(),
            price: data.get("regularMarketPrice").and_then(|v| v.as_f64()),
            change_percent: data
                .get("regularMarketChangePercent")
                .and_then(|v| v.as_f64()),
            fifty_two_week_high: data.get("fiftyTwoWeekHigh").and_then(|v| v.as_f64()),
            fifty_two_week_low: data.get("fiftyTwoWeekLow").and_then(|v| v.as_f64()),
        })
    }

    /// Normalize a free-form company name or symbol into a canonical ticker.
    /// Falls back to the uppercased trimmed input on any lookup failure;
    /// never returns an error.
    pub async fn resolve_ticker(&self, input: &str) -> String {
        let normalized = input.trim().to_uppercase();
        if normalized.is_empty() {
            return normalized;
        }

        match self.get_quote(&normalized).await {
            Ok(quote) => quote.symbol,
            Err(e) => {
                tracing::debug!("ticker resolution fell back to input for {normalized}: {e}");
                normalized
            }
        }
    }

    /// Key ratios derived from quote fields. Derived ratios (P/FCF, EV/FCF,
    /// Debt/FCF) are computed only when their inputs are present and free
    /// cash flow is positive.
    pub async fn get_key_ratios(&self, symbol: &str) -> Result<KeyRatios, FetchError> {
        let json = self
            .get_json(&format!("/v8/finance/quote?symbols={symbol}"))
            .await?;

        let data = Self::first_quote_result(&json)
            .ok_or_else(|| FetchError::Parse(format!("no quote data for {symbol}")))?;

        let f = |key: &str| data.get(key).and_then(|v| v.as_f64());

        let market_cap = f("marketCap");
        let enterprise_value = f("enterpriseValue");
        let total_debt = f("totalDebt");
        let free_cash_flow = f("freeCashflow");

        let over_fcf = |numerator: Option<f64>| match (numerator, free_cash_flow) {
            (Some(n), Some(fcf)) if fcf > 0.0 => Some(n / fcf),
            _ => None,
        };

        Ok(KeyRatios {
            ticker: symbol.to_string(),
            company_name: data
                .get("longName")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            pe_ratio: f("trailingPE").or_else(|| f("forwardPE")),
            ps_ratio: f("priceToSalesTrailing12Months"),
            pb_ratio: f("priceToBook"),
            price_to_fcf: over_fcf(market_cap),
            ev_to_fcf: over_fcf(enterprise_value),
            debt_to_fcf: over_fcf(total_debt),
            quick_ratio: f("quickRatio"),
            current_ratio: f("currentRatio"),
            payout_ratio: f("payoutRatio"),
            market_cap,
            enterprise_value,
            total_debt,
            free_cash_flow,
        })
    }

    /// Latest company news from the search endpoint.
    pub async fn get_news(&self, symbol: &str, limit: usize) -> Result<Vec<NewsArticle>, FetchError> {
        let json = self
            .get_json(&format!("/v1/finance/search?q={symbol}&newsCount={limit}"))
            .await?;

        let items = json
            .get("news")
            .and_then(|v| v.as_array())
            .ok_or_else(|| FetchError::Parse("no news array in response".to_string()))?;

        Ok(items
            .iter()
            .take(limit)
            .filter_map(|item| {
                let title = item.get("title").and_then(|v| v.as_str())?;
                Some(NewsArticle {
                    title: title.to_string(),
                    source: item
                        .get("publisher")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    published_at: item
                        .get("providerPublishTime")
                        .and_then(|v| v.as_i64())
                        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
                    url: item.get("link").and_then(|v| v.as_str()).map(str::to_string),
                    summary: None,
                    sentiment: None,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ResolveTicker for MarketDataClient {
    async fn resolve(&self, input: &str) -> String {
        self.resolve_ticker(input).await
    }
}
