use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Daily OHLCV price bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Company profile: sector, industry, listing venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyFacts {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub market_cap: Option<f64>,
    pub number_of_employees: Option<i64>,
    pub website_url: Option<String>,
}

/// Financial ratios and per-share figures for one reporting period.
/// Every figure is optional; a missing field stays missing all the way to
/// the rendered report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub report_period: Option<String>,
    pub period: Option<String>,

    // Valuation
    pub price_to_earnings_ratio: Option<f64>,
    pub price_to_sales_ratio: Option<f64>,
    pub price_to_book_ratio: Option<f64>,
    pub price_to_free_cash_flow_ratio: Option<f64>,
    pub ev_to_ebitda_ratio: Option<f64>,
    pub ev_to_free_cash_flow_ratio: Option<f64>,
    pub peg_ratio: Option<f64>,

    // Profitability
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_invested_capital: Option<f64>,

    // Growth
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub earnings_per_share_growth: Option<f64>,
    pub free_cash_flow_growth: Option<f64>,

    // Health
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub interest_coverage: Option<f64>,

    // Per share
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub free_cash_flow_per_share: Option<f64>,
    pub revenue_per_share: Option<f64>,

    pub market_cap: Option<f64>,
}

/// One period of income statement / balance sheet / cash flow figures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub fiscal_period: Option<String>,
    pub fiscal_year: Option<i32>,
    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shareholders_equity: Option<f64>,
    pub cash_flow_operating: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

/// Regulatory filing reference (10-K, 10-Q, 8-K, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filing {
    pub filing_type: Option<String>,
    pub filing_date: Option<String>,
    pub report_period: Option<String>,
    pub url: Option<String>,
}

/// Reported insider transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderTrade {
    pub filing_date: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub transaction_type: Option<String>,
    pub shares: Option<f64>,
    pub price_per_share: Option<f64>,
    pub total_value: Option<f64>,
}

/// Institutional holder position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionalHolder {
    pub investor: Option<String>,
    pub report_period: Option<String>,
    pub shares: Option<f64>,
    pub market_value: Option<f64>,
    pub change_in_shares: Option<f64>,
}

/// Earnings press release (management commentary)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressRelease {
    pub date: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// Analyst consensus estimates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalystEstimates {
    pub consensus_rating: Option<String>,
    pub mean_price_target: Option<f64>,
    pub high_price_target: Option<f64>,
    pub low_price_target: Option<f64>,
    pub analyst_count: Option<i32>,
    pub next_earnings_date: Option<String>,
}

/// News article, normalized across providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
}

/// Key ratios derived from a market-data quote (the secondary,
/// quote-sourced view; the provider metrics snapshot is the primary)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyRatios {
    pub ticker: String,
    pub company_name: Option<String>,
    pub pe_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub price_to_fcf: Option<f64>,
    pub ev_to_fcf: Option<f64>,
    pub debt_to_fcf: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub current_ratio: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub total_debt: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

/// Market-data quote used for ticker resolution and price context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<f64>,
    pub change_percent: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}
