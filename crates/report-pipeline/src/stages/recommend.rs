//! Stage 4: investment recommendation
//!
//! Re-fetches the figures it scores rather than parsing them back out of the
//! earlier fragments; the scorecard works on typed data, the report on text.

use analysis_core::{FinancialStatement, InsiderTrade, InstitutionalHolder, PipelineError, StockData};

use crate::context::StageContext;
use crate::markdown::{money, num, pct, pct_raw, table, NA};
use crate::signal::{self, Scorecard};

const INSIDER_LIMIT: u32 = 20;
const HOLDER_LIMIT: u32 = 20;
const STATEMENTS_LIMIT: u32 = 8;

pub async fn run(data: &dyn StockData, ctx: &StageContext) -> Result<String, PipelineError> {
    let ticker = ctx.ticker();

    let snapshot = data.metrics_snapshot(ticker).await?;
    let ratios = data.key_ratios(ticker).await?;
    let prices = data.prices(ticker).await?;
    let statements = data.statements(ticker, STATEMENTS_LIMIT).await?;
    let estimates = data.analyst_estimates(ticker).await?;
    let insiders = data.insider_trades(ticker, INSIDER_LIMIT).await?;
    let holders = data.institutional_ownership(ticker, HOLDER_LIMIT).await?;

    let snap = snapshot.ok();
    let rat = ratios.ok();
    let est = estimates.ok();
    let trades = insiders.ok().map(|v| v.as_slice());
    let current_price = prices
        .ok()
        .and_then(|bars| bars.last())
        .map(|bar| bar.close);

    let card = signal::assess(snap, rat, trades, est, current_price);

    let mut out = String::new();
    out.push_str("## Investment Recommendation\n\n");

    // 1. Executive summary & rating
    out.push_str("### Executive Summary & Rating\n\n");
    out.push_str(&format!("Recommendation: {}\n\n", card.action.as_str()));
    out.push_str(&format!(
        "- Signal score: {} ({} drivers)\n- Risk rating: {}\n- Current price: {}\n- Consensus target: {}\n- Implied upside: {}\n\n",
        card.score,
        card.drivers.len(),
        card.risk.as_str(),
        num(current_price),
        num(card.target_price),
        pct_raw(card.upside_percent),
    ));

    // 2. Valuation summary
    out.push_str("### Valuation Summary\n\n");
    out.push_str(&valuation_summary(&card, snap, rat));
    out.push('\n');

    // 3. Financial performance
    out.push_str("### Financial Performance\n\n");
    match statements.ok().filter(|s| !s.is_empty()) {
        Some(rows) => out.push_str(&performance_table(rows)),
        None => out.push_str(&format!(
            "Financial statements unavailable ({}).\n",
            statements.error().unwrap_or("no data")
        )),
    }
    out.push('\n');

    // 4. Profitability & returns
    out.push_str("### Profitability & Returns\n\n");
    out.push_str(&table(
        &["Metric", "Value"],
        &[
            vec!["Gross Margin".to_string(), pct(snap.and_then(|s| s.gross_margin))],
            vec!["Operating Margin".to_string(), pct(snap.and_then(|s| s.operating_margin))],
            vec!["Net Margin".to_string(), pct(snap.and_then(|s| s.net_margin))],
            vec!["ROE".to_string(), pct(snap.and_then(|s| s.return_on_equity))],
            vec!["ROIC".to_string(), pct(snap.and_then(|s| s.return_on_invested_capital))],
        ],
    ));
    out.push('\n');

    // 5. Financial health scorecard
    out.push_str("### Financial Health Scorecard\n\n");
    out.push_str(&health_scorecard(snap, rat));
    out.push('\n');

    // 6. Growth analysis
    out.push_str("### Growth Analysis\n\n");
    out.push_str(&table(
        &["Metric", "Value"],
        &[
            vec!["Revenue Growth (YoY)".to_string(), pct(snap.and_then(|s| s.revenue_growth))],
            vec!["Earnings Growth (YoY)".to_string(), pct(snap.and_then(|s| s.earnings_growth))],
            vec![
                "EPS Growth (YoY)".to_string(),
                pct(snap.and_then(|s| s.earnings_per_share_growth)),
            ],
            vec!["FCF Growth (YoY)".to_string(), pct(snap.and_then(|s| s.free_cash_flow_growth))],
        ],
    ));
    out.push('\n');

    // 7. Insider activity & ownership
    out.push_str("### Insider Activity & Ownership\n\n");
    out.push_str(&ownership_section(trades, holders.ok().map(|v| v.as_slice())));
    out.push('\n');

    // 8. Price targets & catalysts
    out.push_str("### Price Targets & Catalysts\n\n");
    match est {
        Some(e) => {
            out.push_str(&format!(
                "- Consensus rating: {}\n- Mean target: {} (range {} – {}, {} analysts)\n- Next earnings date: {}\n",
                e.consensus_rating.as_deref().unwrap_or(NA),
                num(e.mean_price_target),
                num(e.low_price_target),
                num(e.high_price_target),
                e.analyst_count.map(|c| c.to_string()).unwrap_or_else(|| NA.to_string()),
                e.next_earnings_date.as_deref().unwrap_or(NA),
            ));
        }
        None => out.push_str(&format!(
            "Analyst estimates unavailable ({}).\n",
            estimates.error().unwrap_or("no data")
        )),
    }
    out.push('\n');

    // 9. Risk factors
    out.push_str("### Risk Factors\n\n");
    out.push_str(&risk_factors(&card));
    out.push('\n');

    // 10. Investment thesis
    out.push_str("### Investment Thesis\n\n");
    out.push_str(&thesis(&card));

    Ok(out)
}

fn valuation_summary(
    card: &Scorecard,
    snap: Option<&analysis_core::FinancialMetrics>,
    rat: Option<&analysis_core::KeyRatios>,
) -> String {
    let pe = snap
        .and_then(|s| s.price_to_earnings_ratio)
        .or_else(|| rat.and_then(|r| r.pe_ratio));
    let peg = snap.and_then(|s| s.peg_ratio);
    let pb = snap
        .and_then(|s| s.price_to_book_ratio)
        .or_else(|| rat.and_then(|r| r.pb_ratio));
    let pfcf = snap
        .and_then(|s| s.price_to_free_cash_flow_ratio)
        .or_else(|| rat.and_then(|r| r.price_to_fcf));

    let assessment = |value: Option<f64>, cheap: f64, rich: f64| -> String {
        match value {
            Some(v) if v > 0.0 && v < cheap => "Attractive".to_string(),
            Some(v) if v > rich => "Rich".to_string(),
            Some(_) => "Fair".to_string(),
            None => NA.to_string(),
        }
    };

    let mut rows = vec![
        vec!["P/E Ratio".to_string(), num(pe), assessment(pe, 15.0, 30.0)],
        vec!["PEG Ratio".to_string(), num(peg), assessment(peg, 1.0, 2.5)],
        vec!["P/B Ratio".to_string(), num(pb), assessment(pb, 1.5, 6.0)],
        vec!["P/FCF Ratio".to_string(), num(pfcf), assessment(pfcf, 15.0, 35.0)],
    ];
    rows.push(vec![
        "Upside to Target".to_string(),
        pct_raw(card.upside_percent),
        match card.upside_percent {
            Some(u) if u > 15.0 => "Attractive".to_string(),
            Some(u) if u < -10.0 => "Rich".to_string(),
            Some(_) => "Fair".to_string(),
            None => NA.to_string(),
        },
    ]);
    table(&["Metric", "Current", "Assessment"], &rows)
}

fn performance_table(rows: &[FinancialStatement]) -> String {
    let data: Vec<Vec<String>> = rows
        .iter()
        .map(|s| {
            vec![
                format!(
                    "{} {}",
                    s.fiscal_period.as_deref().unwrap_or("?"),
                    s.fiscal_year.map(|y| y.to_string()).unwrap_or_default()
                ),
                money(s.revenue),
                money(s.operating_income),
                money(s.net_income),
                money(s.free_cash_flow),
            ]
        })
        .collect();
    table(&["Period", "Revenue", "Operating Income", "Net Income", "FCF"], &data)
}

fn health_scorecard(
    snap: Option<&analysis_core::FinancialMetrics>,
    rat: Option<&analysis_core::KeyRatios>,
) -> String {
    let status = |value: Option<f64>, healthy: fn(f64) -> bool| -> String {
        match value {
            Some(v) if healthy(v) => "Healthy".to_string(),
            Some(_) => "Warning".to_string(),
            None => NA.to_string(),
        }
    };

    let current = snap
        .and_then(|s| s.current_ratio)
        .or_else(|| rat.and_then(|r| r.current_ratio));
    let quick = snap
        .and_then(|s| s.quick_ratio)
        .or_else(|| rat.and_then(|r| r.quick_ratio));
    let de = snap.and_then(|s| s.debt_to_equity);
    let coverage = snap.and_then(|s| s.interest_coverage);

    table(
        &["Metric", "Value", "Status"],
        &[
            vec!["Current Ratio".to_string(), num(current), status(current, |v| v >= 1.0)],
            vec!["Quick Ratio".to_string(), num(quick), status(quick, |v| v >= 0.8)],
            vec!["Debt / Equity".to_string(), num(de), status(de, |v| v <= 2.0)],
            vec![
                "Interest Coverage".to_string(),
                num(coverage),
                status(coverage, |v| v >= 3.0),
            ],
        ],
    )
}

fn ownership_section(
    trades: Option<&[InsiderTrade]>,
    holders: Option<&[InstitutionalHolder]>,
) -> String {
    let mut out = String::new();

    match trades.filter(|t| !t.is_empty()) {
        Some(trades) => {
            let net: f64 = trades
                .iter()
                .filter_map(|t| {
                    let value = t.total_value?;
                    let kind = t.transaction_type.as_deref()?.to_lowercase();
                    if kind.contains("buy") || kind.contains("purchase") {
                        Some(value)
                    } else if kind.contains("sale") || kind.contains("sell") {
                        Some(-value)
                    } else {
                        None
                    }
                })
                .sum();
            let direction = if net > 0.0 {
                "net buying"
            } else if net < 0.0 {
                "net selling"
            } else {
                "balanced"
            };
            out.push_str(&format!(
                "Insider transactions over the trailing year: {} reported, {} ({}).\n\n",
                trades.len(),
                direction,
                money(Some(net)),
            ));
        }
        None => out.push_str("Insider transaction data unavailable.\n\n"),
    }

    match holders.filter(|h| !h.is_empty()) {
        Some(holders) => {
            let mut sorted: Vec<&InstitutionalHolder> = holders.iter().collect();
            sorted.sort_by(|a, b| {
                b.market_value
                    .unwrap_or(0.0)
                    .partial_cmp(&a.market_value.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let rows: Vec<Vec<String>> = sorted
                .iter()
                .take(5)
                .map(|h| {
                    vec![
                        h.investor.clone().unwrap_or_else(|| "?".to_string()),
                        money(h.market_value),
                        num(h.change_in_shares),
                    ]
                })
                .collect();
            out.push_str("Largest institutional holders:\n\n");
            out.push_str(&table(&["Holder", "Position", "Share Change"], &rows));
        }
        None => out.push_str("Institutional ownership data unavailable.\n"),
    }

    out
}

fn risk_factors(card: &Scorecard) -> String {
    let bearish: Vec<&signal::Driver> = card.drivers.iter().filter(|d| !d.bullish).collect();
    if bearish.is_empty() {
        return format!(
            "No specific risk factors surfaced from the available data. Overall risk rating: {}.\n",
            card.risk.as_str()
        );
    }
    let mut out = String::new();
    for driver in &bearish {
        let impact = match driver.weight {
            w if w >= 3 => "high impact",
            2 => "medium impact",
            _ => "low impact",
        };
        out.push_str(&format!("- {} ({impact})\n", driver.label));
    }
    out.push_str(&format!("\nOverall risk rating: {}.\n", card.risk.as_str()));
    out
}

fn thesis(card: &Scorecard) -> String {
    let bullish: Vec<&str> = card
        .drivers
        .iter()
        .filter(|d| d.bullish)
        .map(|d| d.label.as_str())
        .collect();
    let bearish: Vec<&str> = card
        .drivers
        .iter()
        .filter(|d| !d.bullish)
        .map(|d| d.label.as_str())
        .collect();

    if bullish.is_empty() && bearish.is_empty() {
        return "Insufficient data to articulate a thesis; the rating above defaults to a \
                neutral stance until provider data becomes available.\n"
            .to_string();
    }

    let mut out = String::new();
    if !bullish.is_empty() {
        out.push_str(&format!("Supporting the rating above: {}.\n", bullish.join("; ")));
    }
    if !bearish.is_empty() {
        out.push_str(&format!("Working against it: {}.\n", bearish.join("; ")));
    }
    out
}
