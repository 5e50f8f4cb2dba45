//! HTTP boundary for the analysis pipeline
//!
//! One POST endpoint runs the four-stage report pipeline; the rest is
//! health plumbing. Budgets are request-scoped, the rate limiter and HTTP
//! clients are shared across requests.

use std::path::PathBuf;
use std::sync::Arc;

use analysis_core::{CallBudget, PipelineError, RateLimiter};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use findata_client::FinDataClient;
use market_data::MarketDataClient;
use marketaux_client::MarketauxClient;
use report_pipeline::{AnalysisReport, BudgetedResolver, LiveStockData, ReportPipeline};
use serde::Deserialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_RATE_LIMIT: usize = 100;
const DEFAULT_CALL_BUDGET: u32 = 60;

/// Server configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub findata_api_key: Option<String>,
    pub marketaux_api_key: Option<String>,
    pub rate_limit: usize,
    pub call_budget: u32,
    pub report_file: Option<PathBuf>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            findata_api_key: var("FINANCIAL_DATASETS_API_KEY"),
            marketaux_api_key: var("MARKETAUX_API_KEY"),
            rate_limit: var("FINSMART_RATE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT),
            call_budget: var("FINSMART_CALL_BUDGET")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CALL_BUDGET),
            report_file: var("FINSMART_REPORT_FILE").map(PathBuf::from),
            bind_addr: var("FINSMART_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

/// Seam between the router and the pipeline, so router tests can run
/// against a stub.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, company: &str) -> Result<AnalysisReport, PipelineError>;
}

/// Production analyzer: shared clients, a fresh call budget per request.
pub struct LiveAnalyzer {
    findata: FinDataClient,
    market: MarketDataClient,
    marketaux: MarketauxClient,
    call_budget: u32,
    report_file: Option<PathBuf>,
}

impl LiveAnalyzer {
    pub fn new(config: &Config) -> Self {
        let limiter = RateLimiter::per_minute(config.rate_limit);

        Self {
            findata: FinDataClient::new(config.findata_api_key.clone(), limiter.clone()),
            market: MarketDataClient::new(limiter.clone()),
            marketaux: MarketauxClient::new(config.marketaux_api_key.clone(), limiter),
            call_budget: config.call_budget,
            report_file: config.report_file.clone(),
        }
    }
}

#[async_trait]
impl Analyzer for LiveAnalyzer {
    async fn analyze(&self, company: &str) -> Result<AnalysisReport, PipelineError> {
        let budget = Arc::new(CallBudget::new(self.call_budget));
        let data = LiveStockData::new(
            self.findata.clone(),
            self.market.clone(),
            self.marketaux.clone(),
            budget.clone(),
        );
        // The resolution lookup counts against the same budget
        let resolver = BudgetedResolver::new(self.market.clone(), budget);

        let mut pipeline = ReportPipeline::new(data, resolver);
        if let Some(path) = &self.report_file {
            pipeline = pipeline.with_report_path(path.clone());
        }

        pipeline.run(company).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn Analyzer>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/test", get(test))
        .route("/api/v1/calculate", post(calculate))
        .route("/api/v1/analyze", post(analyze))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "finsmart-analysis",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

async fn test() -> Json<serde_json::Value> {
    Json(json!({
        "message": "API is working",
        "timestamp": Utc::now(),
    }))
}

/// A panic anywhere below the HTTP layer answers with the error envelope
/// instead of dropping the connection.
fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("request handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "status": "error",
            "message": "internal server error",
            "timestamp": Utc::now(),
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct CalculateRequest {
    expression: String,
}

async fn calculate(Json(req): Json<CalculateRequest>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "success",
        "expression": req.expression,
        "result": calculator::calculate(&req.expression),
        "timestamp": Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    company: String,
}

async fn analyze(State(state): State<AppState>, Json(req): Json<AnalyzeRequest>) -> Response {
    tracing::info!(company = %req.company, "analysis requested");

    match state.analyzer.analyze(&req.company).await {
        Ok(report) => Json(json!({
            "status": "success",
            "company": report.company,
            "analysis": report.analysis,
            "timestamp": report.generated_at,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(company = %req.company, "analysis failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string(),
                    "timestamp": Utc::now(),
                })),
            )
                .into_response()
        }
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    if config.findata_api_key.is_none() {
        tracing::warn!("FINANCIAL_DATASETS_API_KEY not set; provider fetches will degrade");
    }
    if config.marketaux_api_key.is_none() {
        tracing::warn!("MARKETAUX_API_KEY not set; market news will degrade");
    }

    let state = AppState {
        analyzer: Arc::new(LiveAnalyzer::new(&config)),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::BudgetExceeded;
    use axum::body::Body;
    use axum::http::{header, Request};
    use chrono::Utc;
    use tower::ServiceExt;

    struct StubAnalyzer {
        fail: bool,
        panic: bool,
    }

    #[async_trait]
    impl Analyzer for StubAnalyzer {
        async fn analyze(&self, company: &str) -> Result<AnalysisReport, PipelineError> {
            if self.panic {
                panic!("stub blew up");
            }
            if self.fail {
                return Err(PipelineError::Budget(BudgetExceeded { max: 60, used: 60 }));
            }
            Ok(AnalysisReport {
                company: company.to_string(),
                ticker: company.trim().to_uppercase(),
                analysis: "## Research Summary\n\nRecommendation: HOLD".to_string(),
                generated_at: Utc::now(),
            })
        }
    }

    fn app(fail: bool) -> Router {
        router(AppState {
            analyzer: Arc::new(StubAnalyzer { fail, panic: false }),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = app(false)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn root_banner_carries_version() {
        let response = app(false)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn analyze_returns_success_envelope() {
        let request = Request::post("/api/v1/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"company": "Apple"}"#))
            .unwrap();

        let response = app(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["company"], "Apple");
        assert!(body["analysis"]
            .as_str()
            .unwrap()
            .contains("Recommendation: HOLD"));
    }

    #[tokio::test]
    async fn pipeline_failure_maps_to_500_error_envelope() {
        let request = Request::post("/api/v1/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"company": "Apple"}"#))
            .unwrap();

        let response = app(true).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("budget"));
    }

    #[tokio::test]
    async fn handler_panic_answers_with_error_envelope() {
        let app = router(AppState {
            analyzer: Arc::new(StubAnalyzer {
                fail: false,
                panic: true,
            }),
        });
        let request = Request::post("/api/v1/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"company": "Apple"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn calculate_evaluates_arithmetic() {
        let request = Request::post("/api/v1/calculate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"expression": "2 + 3 * 4"}"#))
            .unwrap();

        let response = app(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["result"], "14");
    }

    #[tokio::test]
    async fn calculate_rejects_non_arithmetic_input() {
        let request = Request::post("/api/v1/calculate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"expression": "__import__('os')"}"#))
            .unwrap();

        let response = app(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["result"], "Invalid calculation");
    }

    #[tokio::test]
    async fn missing_body_is_a_client_error() {
        let request = Request::post("/api/v1/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app(false).oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
