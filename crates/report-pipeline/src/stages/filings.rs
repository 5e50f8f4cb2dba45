//! Stage 3: filings analysis
//!
//! Works from filing metadata (type, date, link). Red flags and positive
//! indicators here are cadence-level observations; the stage says so rather
//! than inventing content it cannot see.

use analysis_core::{Filing, PipelineError, StockData};
use chrono::{Duration, NaiveDate, Utc};

use crate::context::StageContext;
use crate::markdown::table;

const FILINGS_LIMIT: u32 = 10;

pub async fn run(data: &dyn StockData, ctx: &StageContext) -> Result<String, PipelineError> {
    let ticker = ctx.ticker();
    let filings = data.filings(ticker, FILINGS_LIMIT).await?;

    let mut out = String::new();
    out.push_str("## Filings Analysis\n\n");

    let items = match filings.ok().filter(|f| !f.is_empty()) {
        Some(items) => items,
        None => {
            out.push_str(&format!(
                "Regulatory filings unavailable ({}); no filing-based findings can be reported.\n",
                filings.error().unwrap_or("no filings returned")
            ));
            return Ok(out);
        }
    };

    out.push_str("### Recent Filings\n\n");
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|f| {
            vec![
                f.filing_type.clone().unwrap_or_else(|| "?".to_string()),
                f.filing_date.clone().unwrap_or_else(|| "undated".to_string()),
                f.url.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    out.push_str(&table(&["Type", "Filed", "Link"], &rows));
    out.push('\n');

    let annual = latest_of_type(items, "10-K");
    let quarterly = latest_of_type(items, "10-Q");
    let current_reports = items
        .iter()
        .filter(|f| f.filing_type.as_deref() == Some("8-K"))
        .count();

    out.push_str("### Positive Indicators\n\n");
    let mut positives = Vec::new();
    if let Some(date) = &annual {
        positives.push(format!("Annual report (10-K) on file, most recently {date}."));
    }
    if let Some(date) = &quarterly {
        positives.push(format!("Quarterly report (10-Q) on file, most recently {date}."));
    }
    if positives.is_empty() {
        out.push_str("None identified from the available filing metadata.\n");
    } else {
        for p in &positives {
            out.push_str(&format!("- {p}\n"));
        }
    }
    out.push('\n');

    out.push_str("### Red Flags\n\n");
    let mut flags = Vec::new();
    if annual.is_none() && quarterly.is_none() {
        flags.push("No periodic report (10-K or 10-Q) among the recent filings.".to_string());
    } else if is_stale(annual.as_deref()) && is_stale(quarterly.as_deref()) {
        flags.push("Most recent periodic report is more than a year old.".to_string());
    }
    if current_reports >= 5 {
        flags.push(format!(
            "Elevated 8-K cadence ({current_reports} current reports in the recent window)."
        ));
    }
    if flags.is_empty() {
        out.push_str("None identified from the available filing metadata.\n");
    } else {
        for f in &flags {
            out.push_str(&format!("- {f}\n"));
        }
    }
    out.push('\n');

    out.push_str(
        "Findings above are drawn from filing metadata only; filing contents were not fetched.\n",
    );

    Ok(out)
}

fn latest_of_type(filings: &[Filing], kind: &str) -> Option<String> {
    filings
        .iter()
        .filter(|f| f.filing_type.as_deref() == Some(kind))
        .filter_map(|f| f.filing_date.clone())
        .max()
}

fn is_stale(date: Option<&str>) -> bool {
    match date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()) {
        Some(d) => Utc::now().date_naive() - d > Duration::days(365),
        // Unparseable or missing date: cannot claim staleness
        None => false,
    }
}
