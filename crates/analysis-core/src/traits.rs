use async_trait::async_trait;

use crate::{
    AnalystEstimates, CompanyFacts, Fetched, Filing, FinancialMetrics, FinancialStatement,
    InsiderTrade, InstitutionalHolder, KeyRatios, NewsArticle, PipelineError, PressRelease,
    PriceBar,
};

/// Best-effort ticker resolution. Implementations must not fail: a lookup
/// error degrades to the uppercased trimmed input.
#[async_trait]
pub trait ResolveTicker: Send + Sync {
    async fn resolve(&self, input: &str) -> String;
}

/// Uniform data surface the report stages draw from.
///
/// Soft provider failures arrive as [`Fetched::Error`] and the run continues
/// with partial data; the only hard error is budget exhaustion, which
/// propagates as [`PipelineError::Budget`] and terminates the run.
#[async_trait]
pub trait StockData: Send + Sync {
    async fn company_facts(&self, ticker: &str) -> Result<Fetched<CompanyFacts>, PipelineError>;

    async fn company_news(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<NewsArticle>>, PipelineError>;

    /// Secondary news provider, symbols comma-separated
    async fn market_news(
        &self,
        symbols: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<NewsArticle>>, PipelineError>;

    async fn press_releases(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<PressRelease>>, PipelineError>;

    async fn filings(&self, ticker: &str, limit: u32)
        -> Result<Fetched<Vec<Filing>>, PipelineError>;

    async fn metrics_snapshot(
        &self,
        ticker: &str,
    ) -> Result<Fetched<FinancialMetrics>, PipelineError>;

    async fn metrics_history(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<FinancialMetrics>>, PipelineError>;

    async fn statements(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<FinancialStatement>>, PipelineError>;

    async fn prices(&self, ticker: &str) -> Result<Fetched<Vec<PriceBar>>, PipelineError>;

    async fn key_ratios(&self, ticker: &str) -> Result<Fetched<KeyRatios>, PipelineError>;

    async fn insider_trades(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<InsiderTrade>>, PipelineError>;

    async fn institutional_ownership(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<InstitutionalHolder>>, PipelineError>;

    async fn analyst_estimates(
        &self,
        ticker: &str,
    ) -> Result<Fetched<AnalystEstimates>, PipelineError>;
}
