//! Client for the financial-datasets REST provider
//!
//! One method per endpoint, all sharing the same call shape: ticker,
//! optional date range, optional limit. Requests go through the
//! process-wide rate limiter; failures map to [`FetchError`] and are folded
//! into tagged results by the pipeline's data source.

use analysis_core::{
    AnalystEstimates, CompanyFacts, FetchError, Filing, FinancialMetrics, FinancialStatement,
    InsiderTrade, InstitutionalHolder, NewsArticle, PressRelease, PriceBar, RateLimiter,
};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.financialdatasets.ai";
const API_KEY_VAR: &str = "FINANCIAL_DATASETS_API_KEY";

/// Long window for valuation/price history
pub fn default_window() -> (NaiveDate, NaiveDate) {
    let end = Utc::now().date_naive();
    let start = end - ChronoDuration::days(5 * 365);
    (start, end)
}

/// Short window for news/insider/ownership data
pub fn recent_window(days_back: i64) -> (NaiveDate, NaiveDate) {
    let end = Utc::now().date_naive();
    let start = end - ChronoDuration::days(days_back);
    (start, end)
}

#[derive(Clone)]
pub struct FinDataClient {
    api_key: Option<String>,
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl FinDataClient {
    pub fn new(api_key: Option<String>, limiter: RateLimiter) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key,
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

    /// Rate-limited GET against `<base>/<path>` with the API-key header,
    /// parsed as JSON.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(FetchError::MissingApiKey(API_KEY_VAR))?;

        self.limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited(format!("{path}: HTTP 429")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http(format!("HTTP {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }

    /// Historical daily price bars; defaults to a 5-year window.
    pub async fn get_prices(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, FetchError> {
        let (default_start, default_end) = default_window();
        let start = start_date.unwrap_or(default_start);
        let end = end_date.unwrap_or(default_end);

        let body: PricesResponse = self
            .get_json(
                "/prices",
                &[
                    ("ticker", ticker.to_string()),
                    ("start_date", start.format("%Y-%m-%d").to_string()),
                    ("end_date", end.format("%Y-%m-%d").to_string()),
                    ("interval", "day".to_string()),
                ],
            )
            .await?;
        Ok(body.prices)
    }

    /// Company profile: name, sector, industry, exchange.
    pub async fn get_company_facts(&self, ticker: &str) -> Result<CompanyFacts, FetchError> {
        let body: CompanyFactsResponse = self
            .get_json("/company-facts", &[("ticker", ticker.to_string())])
            .await?;
        Ok(body.company_facts)
    }

    /// Quarterly ratio history, most recent first.
    pub async fn get_financial_metrics(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Vec<FinancialMetrics>, FetchError> {
        let body: MetricsResponse = self
            .get_json(
                "/financial-metrics",
                &[
                    ("ticker", ticker.to_string()),
                    ("period", "quarterly".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body.financial_metrics)
    }

    /// Current valuation snapshot.
    pub async fn get_metrics_snapshot(&self, ticker: &str) -> Result<FinancialMetrics, FetchError> {
        let body: SnapshotResponse = self
            .get_json(
                "/financial-metrics/snapshot",
                &[("ticker", ticker.to_string())],
            )
            .await?;
        Ok(body.snapshot)
    }

    /// Income statement / balance sheet / cash flow rows, quarterly.
    pub async fn get_financial_statements(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Vec<FinancialStatement>, FetchError> {
        let body: StatementsResponse = self
            .get_json(
                "/financials",
                &[
                    ("ticker", ticker.to_string()),
                    ("period", "quarterly".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body.financials)
    }

    /// Insider transactions, defaulting to the last year of filings.
    pub async fn get_insider_trades(
        &self,
        ticker: &str,
        limit: u32,
        filing_date_gte: Option<NaiveDate>,
    ) -> Result<Vec<InsiderTrade>, FetchError> {
        let (default_start, _) = recent_window(365);
        let gte = filing_date_gte.unwrap_or(default_start);

        let body: InsiderResponse = self
            .get_json(
                "/insider-trades",
                &[
                    ("ticker", ticker.to_string()),
                    ("limit", limit.to_string()),
                    ("filing_date_gte", gte.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        Ok(body.insider_trades)
    }

    /// Top institutional holders, defaulting to the last year of reports.
    pub async fn get_institutional_ownership(
        &self,
        ticker: &str,
        limit: u32,
        report_period_gte: Option<NaiveDate>,
    ) -> Result<Vec<InstitutionalHolder>, FetchError> {
        let (default_start, _) = recent_window(365);
        let gte = report_period_gte.unwrap_or(default_start);

        let body: OwnershipResponse = self
            .get_json(
                "/institutional-ownership",
                &[
                    ("ticker", ticker.to_string()),
                    ("limit", limit.to_string()),
                    ("report_period_gte", gte.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        Ok(body.institutional_ownership)
    }

    /// Earnings press releases (management commentary).
    pub async fn get_press_releases(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Vec<PressRelease>, FetchError> {
        let body: PressReleasesResponse = self
            .get_json(
                "/earnings/press-releases",
                &[
                    ("ticker", ticker.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body.press_releases)
    }

    /// Consensus price targets and estimates.
    pub async fn get_analyst_estimates(
        &self,
        ticker: &str,
    ) -> Result<AnalystEstimates, FetchError> {
        let body: EstimatesResponse = self
            .get_json("/analyst-estimates", &[("ticker", ticker.to_string())])
            .await?;
        Ok(body.analyst_estimates)
    }

    /// Recent regulatory filings.
    pub async fn get_filings(&self, ticker: &str, limit: u32) -> Result<Vec<Filing>, FetchError> {
        let body: FilingsResponse = self
            .get_json(
                "/filings",
                &[
                    ("ticker", ticker.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body.filings)
    }

    /// Financial media news; defaults to the last 30 days.
    pub async fn get_news(
        &self,
        ticker: &str,
        limit: u32,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        let (default_start, default_end) = recent_window(30);
        let start = start_date.unwrap_or(default_start);
        let end = end_date.unwrap_or(default_end);

        let body: NewsResponse = self
            .get_json(
                "/news",
                &[
                    ("ticker", ticker.to_string()),
                    ("limit", limit.to_string()),
                    ("start_date", start.format("%Y-%m-%d").to_string()),
                    ("end_date", end.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;

        Ok(body
            .news
            .into_iter()
            .map(|n| NewsArticle {
                title: n.title,
                source: n.source,
                published_at: n
                    .date
                    .as_deref()
                    .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                url: n.url,
                summary: n.summary,
                sentiment: n.sentiment,
            })
            .collect())
    }
}

// Response envelopes

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    prices: Vec<PriceBar>,
}

#[derive(Debug, Deserialize)]
struct CompanyFactsResponse {
    company_facts: CompanyFacts,
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    financial_metrics: Vec<FinancialMetrics>,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    snapshot: FinancialMetrics,
}

#[derive(Debug, Deserialize)]
struct StatementsResponse {
    #[serde(default)]
    financials: Vec<FinancialStatement>,
}

#[derive(Debug, Deserialize)]
struct InsiderResponse {
    #[serde(default)]
    insider_trades: Vec<InsiderTrade>,
}

#[derive(Debug, Deserialize)]
struct OwnershipResponse {
    #[serde(default)]
    institutional_ownership: Vec<InstitutionalHolder>,
}

#[derive(Debug, Deserialize)]
struct PressReleasesResponse {
    #[serde(default)]
    press_releases: Vec<PressRelease>,
}

#[derive(Debug, Deserialize)]
struct EstimatesResponse {
    analyst_estimates: AnalystEstimates,
}

#[derive(Debug, Deserialize)]
struct FilingsResponse {
    #[serde(default)]
    filings: Vec<Filing>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    news: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    title: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
}
