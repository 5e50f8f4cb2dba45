//! Sequential four-stage report pipeline
//!
//! Research, financial analysis, filings analysis, recommendation — each
//! stage a plain function over (ticker, prior context, data source) that
//! appends a markdown fragment. The orchestrator drives the stages strictly
//! in order under a per-run call budget.

pub mod context;
pub mod markdown;
pub mod orchestrator;
pub mod signal;
pub mod source;
pub mod stages;

pub use context::StageContext;
pub use orchestrator::{AnalysisReport, PipelineStage, ReportPipeline};
pub use signal::{Action, RiskRating, Scorecard};
pub use source::{BudgetedResolver, LiveStockData};
