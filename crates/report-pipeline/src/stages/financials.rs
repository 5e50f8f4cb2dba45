//! Stage 2: quantitative financial analysis
//!
//! Valuation, profitability, growth, health and per-share figures rendered
//! as tables. Every cell goes through the markdown formatters, so a figure
//! whose backing fetch errored renders as `n/a` instead of a number.

use analysis_core::{FinancialMetrics, KeyRatios, PipelineError, PriceBar, StockData};

use crate::context::StageContext;
use crate::markdown::{money, num, pct, table};

const METRICS_HISTORY_LIMIT: u32 = 8;
const STATEMENTS_LIMIT: u32 = 8;

pub async fn run(data: &dyn StockData, ctx: &StageContext) -> Result<String, PipelineError> {
    let ticker = ctx.ticker();

    let snapshot = data.metrics_snapshot(ticker).await?;
    let history = data.metrics_history(ticker, METRICS_HISTORY_LIMIT).await?;
    let statements = data.statements(ticker, STATEMENTS_LIMIT).await?;
    let prices = data.prices(ticker).await?;
    let ratios = data.key_ratios(ticker).await?;

    let snap = snapshot.ok();
    let rat = ratios.ok();

    let mut out = String::new();
    out.push_str("## Financial Analysis\n\n");

    if snap.is_none() {
        out.push_str(&format!(
            "Provider metrics snapshot unavailable ({}); falling back to quote-derived ratios where possible.\n\n",
            snapshot.error().unwrap_or("no data")
        ));
    }

    out.push_str("### Valuation Ratios\n\n");
    out.push_str(&valuation_table(snap, rat));
    out.push('\n');

    out.push_str("### Profitability\n\n");
    out.push_str(&table(
        &["Metric", "Value"],
        &[
            row("Gross Margin", pct(snap.and_then(|s| s.gross_margin))),
            row("Operating Margin", pct(snap.and_then(|s| s.operating_margin))),
            row("Net Margin", pct(snap.and_then(|s| s.net_margin))),
            row("ROE", pct(snap.and_then(|s| s.return_on_equity))),
            row("ROA", pct(snap.and_then(|s| s.return_on_assets))),
            row("ROIC", pct(snap.and_then(|s| s.return_on_invested_capital))),
        ],
    ));
    out.push('\n');

    out.push_str("### Growth\n\n");
    out.push_str(&table(
        &["Metric", "Value"],
        &[
            row("Revenue Growth (YoY)", pct(snap.and_then(|s| s.revenue_growth))),
            row("Earnings Growth (YoY)", pct(snap.and_then(|s| s.earnings_growth))),
            row("EPS Growth (YoY)", pct(snap.and_then(|s| s.earnings_per_share_growth))),
            row("FCF Growth (YoY)", pct(snap.and_then(|s| s.free_cash_flow_growth))),
        ],
    ));
    out.push('\n');

    out.push_str("### Financial Health\n\n");
    out.push_str(&table(
        &["Metric", "Value"],
        &[
            row(
                "Current Ratio",
                num(snap
                    .and_then(|s| s.current_ratio)
                    .or_else(|| rat.and_then(|r| r.current_ratio))),
            ),
            row(
                "Quick Ratio",
                num(snap
                    .and_then(|s| s.quick_ratio)
                    .or_else(|| rat.and_then(|r| r.quick_ratio))),
            ),
            row("Debt / Equity", num(snap.and_then(|s| s.debt_to_equity))),
            row("Interest Coverage", num(snap.and_then(|s| s.interest_coverage))),
        ],
    ));
    out.push('\n');

    out.push_str("### Per-Share Metrics\n\n");
    out.push_str(&table(
        &["Metric", "Value"],
        &[
            row("EPS", num(snap.and_then(|s| s.earnings_per_share))),
            row("Book Value / Share", num(snap.and_then(|s| s.book_value_per_share))),
            row("FCF / Share", num(snap.and_then(|s| s.free_cash_flow_per_share))),
            row("Revenue / Share", num(snap.and_then(|s| s.revenue_per_share))),
        ],
    ));
    out.push('\n');

    out.push_str("### Quarterly Trend\n\n");
    match statements.ok().filter(|s| !s.is_empty()) {
        Some(rows) => {
            let trend: Vec<Vec<String>> = rows
                .iter()
                .map(|s| {
                    vec![
                        format!(
                            "{} {}",
                            s.fiscal_period.as_deref().unwrap_or("?"),
                            s.fiscal_year.map(|y| y.to_string()).unwrap_or_default()
                        ),
                        money(s.revenue),
                        money(s.net_income),
                        num(s.earnings_per_share),
                        money(s.free_cash_flow),
                    ]
                })
                .collect();
            out.push_str(&table(&["Quarter", "Revenue", "Net Income", "EPS", "FCF"], &trend));
        }
        None => out.push_str(&format!(
            "Quarterly statements unavailable ({}).\n",
            statements.error().unwrap_or("no data")
        )),
    }
    out.push('\n');

    out.push_str("### Price History\n\n");
    match prices.ok().filter(|p| !p.is_empty()) {
        Some(bars) => out.push_str(&price_summary(bars)),
        None => out.push_str(&format!(
            "Price history unavailable ({}).\n",
            prices.error().unwrap_or("no data")
        )),
    }
    out.push('\n');

    out.push_str("### Peer Comparison\n\n");
    // Historical ratio medians stand in for a true peer set; the configured
    // providers expose no direct peer endpoint.
    match history.ok().filter(|h| h.len() >= 2) {
        Some(rows) => {
            out.push_str("Current ratios against this company's own trailing quarters:\n\n");
            out.push_str(&history_comparison(snap, rows));
        }
        None => out.push_str(
            "Peer and historical comparison data unavailable from the configured sources.\n",
        ),
    }

    Ok(out)
}

fn row(label: &str, value: String) -> Vec<String> {
    vec![label.to_string(), value]
}

fn valuation_table(snap: Option<&FinancialMetrics>, rat: Option<&KeyRatios>) -> String {
    table(
        &["Metric", "Value"],
        &[
            row(
                "P/E Ratio",
                num(snap
                    .and_then(|s| s.price_to_earnings_ratio)
                    .or_else(|| rat.and_then(|r| r.pe_ratio))),
            ),
            row(
                "P/S Ratio",
                num(snap
                    .and_then(|s| s.price_to_sales_ratio)
                    .or_else(|| rat.and_then(|r| r.ps_ratio))),
            ),
            row(
                "P/B Ratio",
                num(snap
                    .and_then(|s| s.price_to_book_ratio)
                    .or_else(|| rat.and_then(|r| r.pb_ratio))),
            ),
            row(
                "P/FCF Ratio",
                num(snap
                    .and_then(|s| s.price_to_free_cash_flow_ratio)
                    .or_else(|| rat.and_then(|r| r.price_to_fcf))),
            ),
            row("EV/EBITDA", num(snap.and_then(|s| s.ev_to_ebitda_ratio))),
            row(
                "EV/FCF",
                num(snap
                    .and_then(|s| s.ev_to_free_cash_flow_ratio)
                    .or_else(|| rat.and_then(|r| r.ev_to_fcf))),
            ),
            row("PEG Ratio", num(snap.and_then(|s| s.peg_ratio))),
        ],
    )
}

fn price_summary(bars: &[PriceBar]) -> String {
    let first = &bars[0];
    let last = &bars[bars.len() - 1];
    let change = if first.close > 0.0 {
        Some((last.close - first.close) / first.close)
    } else {
        None
    };
    let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    format!(
        "Latest close {} ({} bars from {} to {}). Period change: {}. Range: {} – {}.\n",
        num(Some(last.close)),
        bars.len(),
        first.time,
        last.time,
        pct(change),
        num(Some(low)),
        num(Some(high)),
    )
}

fn history_comparison(snap: Option<&FinancialMetrics>, history: &[FinancialMetrics]) -> String {
    let median = |extract: fn(&FinancialMetrics) -> Option<f64>| -> Option<f64> {
        let mut values: Vec<f64> = history.iter().filter_map(extract).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Some(values[values.len() / 2])
    };

    table(
        &["Metric", "Current", "Trailing Median"],
        &[
            vec![
                "P/E Ratio".to_string(),
                num(snap.and_then(|s| s.price_to_earnings_ratio)),
                num(median(|m| m.price_to_earnings_ratio)),
            ],
            vec![
                "Net Margin".to_string(),
                pct(snap.and_then(|s| s.net_margin)),
                pct(median(|m| m.net_margin)),
            ],
            vec![
                "ROE".to_string(),
                pct(snap.and_then(|s| s.return_on_equity)),
                pct(median(|m| m.return_on_equity)),
            ],
        ],
    )
}
