//! Live data source backing the pipeline stages
//!
//! Every method charges the per-run call budget before touching a client,
//! then folds the client result into a tagged fetch. Budget exhaustion is
//! the only path that returns an error.

use std::sync::Arc;

use analysis_core::{
    AnalystEstimates, CallBudget, CompanyFacts, Fetched, Filing, FinancialMetrics,
    FinancialStatement, InsiderTrade, InstitutionalHolder, KeyRatios, NewsArticle, PipelineError,
    PressRelease, PriceBar, ResolveTicker, StockData,
};
use async_trait::async_trait;
use findata_client::FinDataClient;
use market_data::MarketDataClient;
use marketaux_client::MarketauxClient;

/// Budget-charging wrapper around a resolver. The lookup is an outbound
/// call like any other, so it consumes a budget slot; since resolution must
/// never fail the caller, a spent budget skips the lookup and degrades to
/// the uppercased trimmed input.
pub struct BudgetedResolver<R> {
    inner: R,
    budget: Arc<CallBudget>,
}

impl<R> BudgetedResolver<R> {
    pub fn new(inner: R, budget: Arc<CallBudget>) -> Self {
        Self { inner, budget }
    }
}

#[async_trait]
impl<R: ResolveTicker> ResolveTicker for BudgetedResolver<R> {
    async fn resolve(&self, input: &str) -> String {
        if self.budget.try_acquire().is_err() {
            tracing::warn!("call budget spent before resolution, using input as ticker");
            return input.trim().to_uppercase();
        }
        self.inner.resolve(input).await
    }
}

pub struct LiveStockData {
    findata: FinDataClient,
    market: MarketDataClient,
    marketaux: MarketauxClient,
    budget: Arc<CallBudget>,
}

impl LiveStockData {
    pub fn new(
        findata: FinDataClient,
        market: MarketDataClient,
        marketaux: MarketauxClient,
        budget: Arc<CallBudget>,
    ) -> Self {
        Self {
            findata,
            market,
            marketaux,
            budget,
        }
    }

    pub fn budget(&self) -> &CallBudget {
        &self.budget
    }
}

#[async_trait]
impl StockData for LiveStockData {
    async fn company_facts(&self, ticker: &str) -> Result<Fetched<CompanyFacts>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.findata.get_company_facts(ticker).await.into())
    }

    async fn company_news(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<NewsArticle>>, PipelineError> {
        self.budget.try_acquire()?;
        match self.findata.get_news(ticker, limit, None, None).await {
            Ok(news) => Ok(Fetched::Data(news)),
            // Quote-API news is the fallback when the provider fetch fails
            Err(primary) => {
                tracing::warn!("provider news failed, trying quote-API news: {primary}");
                self.budget.try_acquire()?;
                match self.market.get_news(ticker, limit as usize).await {
                    Ok(news) => Ok(Fetched::Data(news)),
                    Err(_) => Ok(Fetched::Error {
                        error: primary.to_string(),
                    }),
                }
            }
        }
    }

    async fn market_news(
        &self,
        symbols: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<NewsArticle>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.marketaux.get_news(symbols, limit).await.into())
    }

    async fn press_releases(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<PressRelease>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.findata.get_press_releases(ticker, limit).await.into())
    }

    async fn filings(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<Filing>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.findata.get_filings(ticker, limit).await.into())
    }

    async fn metrics_snapshot(
        &self,
        ticker: &str,
    ) -> Result<Fetched<FinancialMetrics>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.findata.get_metrics_snapshot(ticker).await.into())
    }

    async fn metrics_history(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<FinancialMetrics>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.findata.get_financial_metrics(ticker, limit).await.into())
    }

    async fn statements(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<FinancialStatement>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self
            .findata
            .get_financial_statements(ticker, limit)
            .await
            .into())
    }

    async fn prices(&self, ticker: &str) -> Result<Fetched<Vec<PriceBar>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.findata.get_prices(ticker, None, None).await.into())
    }

    async fn key_ratios(&self, ticker: &str) -> Result<Fetched<KeyRatios>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.market.get_key_ratios(ticker).await.into())
    }

    async fn insider_trades(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<InsiderTrade>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self
            .findata
            .get_insider_trades(ticker, limit, None)
            .await
            .into())
    }

    async fn institutional_ownership(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Fetched<Vec<InstitutionalHolder>>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self
            .findata
            .get_institutional_ownership(ticker, limit, None)
            .await
            .into())
    }

    async fn analyst_estimates(
        &self,
        ticker: &str,
    ) -> Result<Fetched<AnalystEstimates>, PipelineError> {
        self.budget.try_acquire()?;
        Ok(self.findata.get_analyst_estimates(ticker).await.into())
    }
}
