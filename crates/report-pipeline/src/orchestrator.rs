//! Stage sequencing
//!
//! Drives the four stages strictly in order; each stage sees the fragments
//! of every stage before it and nothing after. A stage's fetch problems are
//! already folded into its fragment, so the only error that escapes `run`
//! is budget exhaustion.

use std::path::PathBuf;

use analysis_core::{PipelineError, ResolveTicker, StockData};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::StageContext;
use crate::stages;

/// Stage machine: each variant knows its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Research,
    FinancialAnalysis,
    FilingsAnalysis,
    Recommendation,
    Done,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Research => "research",
            PipelineStage::FinancialAnalysis => "financial-analysis",
            PipelineStage::FilingsAnalysis => "filings-analysis",
            PipelineStage::Recommendation => "recommendation",
            PipelineStage::Done => "done",
        }
    }

    pub fn next(&self) -> PipelineStage {
        match self {
            PipelineStage::Research => PipelineStage::FinancialAnalysis,
            PipelineStage::FinancialAnalysis => PipelineStage::FilingsAnalysis,
            PipelineStage::FilingsAnalysis => PipelineStage::Recommendation,
            PipelineStage::Recommendation => PipelineStage::Done,
            PipelineStage::Done => PipelineStage::Done,
        }
    }
}

/// Finished report for one company.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub company: String,
    pub ticker: String,
    pub analysis: String,
    pub generated_at: DateTime<Utc>,
}

pub struct ReportPipeline<D, R> {
    data: D,
    resolver: R,
    report_path: Option<PathBuf>,
}

impl<D: StockData, R: ResolveTicker> ReportPipeline<D, R> {
    pub fn new(data: D, resolver: R) -> Self {
        Self {
            data,
            resolver,
            report_path: None,
        }
    }

    /// Also write the finished report to this file. Write failures are
    /// logged, not fatal.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Run all four stages for a company name or ticker.
    pub async fn run(&self, company: &str) -> Result<AnalysisReport, PipelineError> {
        let ticker = self.resolver.resolve(company).await;
        tracing::info!(company, ticker = %ticker, "starting analysis run");

        let mut ctx = StageContext::new(&ticker);
        let mut stage = PipelineStage::Research;

        while stage != PipelineStage::Done {
            tracing::info!(stage = stage.name(), ticker = %ticker, "running stage");
            let fragment = match stage {
                PipelineStage::Research => stages::research::run(&self.data, &ctx).await?,
                PipelineStage::FinancialAnalysis => {
                    stages::financials::run(&self.data, &ctx).await?
                }
                PipelineStage::FilingsAnalysis => stages::filings::run(&self.data, &ctx).await?,
                PipelineStage::Recommendation => stages::recommend::run(&self.data, &ctx).await?,
                PipelineStage::Done => unreachable!("loop exits before Done"),
            };
            ctx.push_fragment(fragment);
            stage = stage.next();
        }

        let report = AnalysisReport {
            company: company.to_string(),
            ticker,
            analysis: ctx.combined(),
            generated_at: Utc::now(),
        };

        if let Some(path) = &self.report_path {
            if let Err(e) = tokio::fs::write(path, &report.analysis).await {
                tracing::warn!("failed to write report to {}: {e}", path.display());
            }
        }

        tracing::info!(ticker = %report.ticker, "analysis run complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = PipelineStage::Research;
        let mut names = Vec::new();
        while stage != PipelineStage::Done {
            names.push(stage.name());
            stage = stage.next();
        }
        assert_eq!(
            names,
            [
                "research",
                "financial-analysis",
                "filings-analysis",
                "recommendation"
            ]
        );
    }

    #[test]
    fn done_is_terminal() {
        assert_eq!(PipelineStage::Done.next(), PipelineStage::Done);
    }
}
