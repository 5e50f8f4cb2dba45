//! Pipeline integration tests over a scripted data source.

use std::sync::{Arc, Mutex};

use analysis_core::{
    AnalystEstimates, CallBudget, CompanyFacts, Fetched, Filing, FinancialMetrics,
    FinancialStatement, InsiderTrade, InstitutionalHolder, KeyRatios, NewsArticle, PipelineError,
    PressRelease, PriceBar, ResolveTicker, StockData,
};
use async_trait::async_trait;
use report_pipeline::{BudgetedResolver, ReportPipeline};

struct StubResolver;

#[async_trait]
impl ResolveTicker for StubResolver {
    async fn resolve(&self, input: &str) -> String {
        input.trim().to_uppercase()
    }
}

/// Scripted data source: records the order of calls, optionally enforces a
/// call budget, and serves configurable snapshot/ratio payloads.
struct StubData {
    calls: Mutex<Vec<&'static str>>,
    budget: Option<Arc<CallBudget>>,
    snapshot: Fetched<FinancialMetrics>,
    ratios: Fetched<KeyRatios>,
}

impl StubData {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            budget: None,
            snapshot: Fetched::Data(FinancialMetrics::default()),
            ratios: Fetched::Data(KeyRatios::default()),
        }
    }

    fn with_budget(mut self, max_calls: u32) -> Self {
        self.budget = Some(Arc::new(CallBudget::new(max_calls)));
        self
    }

    fn with_shared_budget(mut self, budget: Arc<CallBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    fn with_snapshot(mut self, snapshot: Fetched<FinancialMetrics>) -> Self {
        self.snapshot = snapshot;
        self
    }

    fn with_ratios(mut self, ratios: Fetched<KeyRatios>) -> Self {
        self.ratios = ratios;
        self
    }

    fn note(&self, name: &'static str) -> Result<(), PipelineError> {
        if let Some(budget) = &self.budget {
            budget.try_acquire()?;
        }
        self.calls.lock().unwrap().push(name);
        Ok(())
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StockData for &StubData {
    async fn company_facts(&self, ticker: &str) -> Result<Fetched<CompanyFacts>, PipelineError> {
        self.note("company_facts")?;
        Ok(Fetched::Data(CompanyFacts {
            ticker: ticker.to_string(),
            name: Some("Apple Inc.".to_string()),
            sector: Some("Technology".to_string()),
            industry: Some("Consumer Electronics".to_string()),
            exchange: Some("NASDAQ".to_string()),
            market_cap: Some(3.0e12),
            number_of_employees: None,
            website_url: None,
        }))
    }

    async fn company_news(
        &self,
        _ticker: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<NewsArticle>>, PipelineError> {
        self.note("company_news")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn market_news(
        &self,
        _symbols: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<NewsArticle>>, PipelineError> {
        self.note("market_news")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn press_releases(
        &self,
        _ticker: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<PressRelease>>, PipelineError> {
        self.note("press_releases")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn filings(
        &self,
        _ticker: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<Filing>>, PipelineError> {
        self.note("filings")?;
        Ok(Fetched::Data(vec![Filing {
            filing_type: Some("10-K".to_string()),
            filing_date: Some("2026-07-30".to_string()),
            report_period: None,
            url: None,
        }]))
    }

    async fn metrics_snapshot(
        &self,
        _ticker: &str,
    ) -> Result<Fetched<FinancialMetrics>, PipelineError> {
        self.note("metrics_snapshot")?;
        Ok(self.snapshot.clone())
    }

    async fn metrics_history(
        &self,
        _ticker: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<FinancialMetrics>>, PipelineError> {
        self.note("metrics_history")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn statements(
        &self,
        _ticker: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<FinancialStatement>>, PipelineError> {
        self.note("statements")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn prices(&self, _ticker: &str) -> Result<Fetched<Vec<PriceBar>>, PipelineError> {
        self.note("prices")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn key_ratios(&self, _ticker: &str) -> Result<Fetched<KeyRatios>, PipelineError> {
        self.note("key_ratios")?;
        Ok(self.ratios.clone())
    }

    async fn insider_trades(
        &self,
        _ticker: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<InsiderTrade>>, PipelineError> {
        self.note("insider_trades")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn institutional_ownership(
        &self,
        _ticker: &str,
        _limit: u32,
    ) -> Result<Fetched<Vec<InstitutionalHolder>>, PipelineError> {
        self.note("institutional_ownership")?;
        Ok(Fetched::Data(Vec::new()))
    }

    async fn analyst_estimates(
        &self,
        _ticker: &str,
    ) -> Result<Fetched<AnalystEstimates>, PipelineError> {
        self.note("analyst_estimates")?;
        Ok(Fetched::Data(AnalystEstimates::default()))
    }
}

#[tokio::test]
async fn stages_fetch_in_sequence() {
    let data = StubData::new();
    let pipeline = ReportPipeline::new(&data, StubResolver);

    pipeline.run("aapl").await.unwrap();

    let calls = data.calls();
    // Research stage fetches come first, in stage order
    assert_eq!(
        &calls[..4],
        &["company_facts", "company_news", "market_news", "press_releases"]
    );
    // Filings analysis runs after the financial-analysis fetches
    let filings_pos = calls.iter().position(|c| *c == "filings").unwrap();
    let statements_pos = calls.iter().position(|c| *c == "statements").unwrap();
    assert!(filings_pos > statements_pos);
    // The recommendation stage finishes the run
    assert_eq!(calls.last().copied(), Some("institutional_ownership"));
    assert!(calls.contains(&"analyst_estimates"));
}

#[tokio::test]
async fn exhausted_budget_terminates_the_run() {
    let data = StubData::new().with_budget(3);
    let pipeline = ReportPipeline::new(&data, StubResolver);

    let err = pipeline.run("AAPL").await.unwrap_err();
    assert!(matches!(err, PipelineError::Budget(_)));
    // The failing acquisition never reaches a provider
    assert_eq!(data.calls().len(), 3);
}

#[tokio::test]
async fn resolution_charges_the_call_budget() {
    let budget = Arc::new(CallBudget::new(5));
    let data = StubData::new().with_shared_budget(budget.clone());
    let pipeline = ReportPipeline::new(&data, BudgetedResolver::new(StubResolver, budget));

    let err = pipeline.run("AAPL").await.unwrap_err();
    assert!(matches!(err, PipelineError::Budget(_)));
    // Resolution took one of the five slots, so only four fetches went out
    assert_eq!(data.calls().len(), 4);
}

#[tokio::test]
async fn zero_budget_makes_no_external_calls() {
    let budget = Arc::new(CallBudget::new(0));
    let data = StubData::new().with_shared_budget(budget.clone());
    let pipeline = ReportPipeline::new(&data, BudgetedResolver::new(StubResolver, budget));

    let err = pipeline.run("apple").await.unwrap_err();
    assert!(matches!(err, PipelineError::Budget(_)));
    assert!(data.calls().is_empty());
}

#[tokio::test]
async fn spent_budget_degrades_resolution_to_passthrough() {
    struct CanonicalResolver;

    #[async_trait]
    impl ResolveTicker for CanonicalResolver {
        async fn resolve(&self, _input: &str) -> String {
            "CANONICAL".to_string()
        }
    }

    let resolver = BudgetedResolver::new(CanonicalResolver, Arc::new(CallBudget::new(0)));
    assert_eq!(resolver.resolve(" apple ").await, "APPLE");

    let resolver = BudgetedResolver::new(CanonicalResolver, Arc::new(CallBudget::new(1)));
    assert_eq!(resolver.resolve(" apple ").await, "CANONICAL");
}

#[tokio::test]
async fn errored_fetches_render_as_na_not_numbers() {
    let data = StubData::new()
        .with_snapshot(Fetched::Error {
            error: "HTTP 500".to_string(),
        })
        .with_ratios(Fetched::Error {
            error: "HTTP 503".to_string(),
        });
    let pipeline = ReportPipeline::new(&data, StubResolver);

    let report = pipeline.run("AAPL").await.unwrap();

    assert!(report.analysis.contains("Provider metrics snapshot unavailable"));
    assert!(report.analysis.contains("| P/E Ratio | n/a |"));
    assert!(report.analysis.contains("| Current Ratio | n/a |"));
    assert!(report.analysis.contains("| ROE | n/a |"));
}

#[tokio::test]
async fn full_run_produces_one_rated_report() {
    let snapshot = FinancialMetrics {
        price_to_earnings_ratio: Some(28.5),
        current_ratio: Some(1.2),
        net_margin: Some(0.25),
        return_on_equity: Some(0.45),
        revenue_growth: Some(0.08),
        ..Default::default()
    };
    let data = StubData::new().with_snapshot(Fetched::Data(snapshot));
    let pipeline = ReportPipeline::new(&data, StubResolver);

    let report = pipeline.run("  aapl ").await.unwrap();

    assert_eq!(report.ticker, "AAPL");
    assert_eq!(report.company, "  aapl ");

    // Fetched figures appear verbatim
    assert!(report.analysis.contains("| P/E Ratio | 28.5 |"));
    assert!(report.analysis.contains("| Current Ratio | 1.2 |"));

    // Exactly one final call
    let ratings = report.analysis.matches("Recommendation: ").count();
    assert_eq!(ratings, 1);
    assert!(
        report.analysis.contains("Recommendation: BUY")
            || report.analysis.contains("Recommendation: HOLD")
            || report.analysis.contains("Recommendation: SELL")
    );

    // All four stage fragments present, in order
    let research = report.analysis.find("## Research Summary").unwrap();
    let financial = report.analysis.find("## Financial Analysis").unwrap();
    let filings = report.analysis.find("## Filings Analysis").unwrap();
    let recommendation = report.analysis.find("## Investment Recommendation").unwrap();
    assert!(research < financial && financial < filings && filings < recommendation);
}

#[tokio::test]
async fn report_path_receives_the_combined_report() {
    let path = std::env::temp_dir().join(format!("finsmart-report-{}.md", std::process::id()));
    let data = StubData::new();
    let pipeline = ReportPipeline::new(&data, StubResolver).with_report_path(path.clone());

    let report = pipeline.run("AAPL").await.unwrap();

    let written = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(written, report.analysis);
    tokio::fs::remove_file(&path).await.ok();
}

#[tokio::test]
async fn unwritable_report_path_does_not_fail_the_run() {
    // A directory cannot be written as a file, so the write itself fails
    let data = StubData::new();
    let pipeline = ReportPipeline::new(&data, StubResolver).with_report_path(std::env::temp_dir());

    let report = pipeline.run("AAPL").await.unwrap();
    assert!(report.analysis.contains("## Investment Recommendation"));
}
