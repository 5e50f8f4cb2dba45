//! Recommendation scorecard
//!
//! Weighted signal accumulation over whichever figures the run actually
//! obtained. A metric whose fetch failed simply contributes nothing; the
//! rating is computed from the figures that exist.

use analysis_core::{AnalystEstimates, FinancialMetrics, InsiderTrade, KeyRatios};

/// Final call of the recommendation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRating {
    Low,
    Medium,
    High,
}

impl RiskRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRating::Low => "Low",
            RiskRating::Medium => "Medium",
            RiskRating::High => "High",
        }
    }
}

/// One contributing observation, kept for the thesis section.
#[derive(Debug, Clone)]
pub struct Driver {
    pub label: String,
    pub weight: i32,
    pub bullish: bool,
}

#[derive(Debug, Clone)]
pub struct Scorecard {
    pub action: Action,
    pub score: i32,
    pub risk: RiskRating,
    pub drivers: Vec<Driver>,
    pub target_price: Option<f64>,
    pub upside_percent: Option<f64>,
}

/// Build the scorecard from whatever figures are available.
pub fn assess(
    snapshot: Option<&FinancialMetrics>,
    ratios: Option<&KeyRatios>,
    insiders: Option<&[InsiderTrade]>,
    estimates: Option<&AnalystEstimates>,
    current_price: Option<f64>,
) -> Scorecard {
    let mut drivers: Vec<Driver> = Vec::new();
    let mut push = |label: &str, weight: i32, bullish: bool| {
        drivers.push(Driver {
            label: label.to_string(),
            weight,
            bullish,
        });
    };

    let pe = snapshot
        .and_then(|s| s.price_to_earnings_ratio)
        .or_else(|| ratios.and_then(|r| r.pe_ratio));
    let revenue_growth = snapshot.and_then(|s| s.revenue_growth);

    // Valuation: growth-adjusted P/E thresholds
    if let Some(pe) = pe {
        let (low, high) = match revenue_growth {
            Some(g) if g > 0.25 => (25.0, 60.0),
            Some(g) if g > 0.10 => (18.0, 40.0),
            _ => (15.0, 30.0),
        };
        if pe > 0.0 && pe < low {
            push("Low P/E ratio", 3, true);
        } else if pe > high {
            push("Elevated P/E ratio", 2, false);
        }
    }

    if let Some(peg) = snapshot.and_then(|s| s.peg_ratio) {
        if peg > 0.0 && peg < 1.0 {
            push("Attractive PEG ratio", 2, true);
        } else if peg > 2.5 {
            push("Expensive PEG ratio", 1, false);
        }
    }

    // Profitability
    if let Some(roe) = snapshot.and_then(|s| s.return_on_equity) {
        if roe > 0.15 {
            push("Strong return on equity", 3, true);
        } else if roe < 0.05 {
            push("Weak return on equity", 2, false);
        }
    }

    if let Some(margin) = snapshot.and_then(|s| s.net_margin) {
        if margin > 0.15 {
            push("High net margin", 2, true);
        } else if margin < 0.03 {
            push("Thin net margin", 1, false);
        }
    }

    // Growth
    if let Some(growth) = revenue_growth {
        if growth > 0.15 {
            push("Strong revenue growth", 3, true);
        } else if growth < 0.0 {
            push("Shrinking revenue", 3, false);
        }
    }

    if let Some(growth) = snapshot.and_then(|s| s.earnings_per_share_growth) {
        if growth > 0.15 {
            push("Accelerating EPS", 2, true);
        } else if growth < 0.0 {
            push("Declining EPS", 2, false);
        }
    }

    // Balance-sheet health
    let current_ratio = snapshot
        .and_then(|s| s.current_ratio)
        .or_else(|| ratios.and_then(|r| r.current_ratio));
    if let Some(cr) = current_ratio {
        if cr > 1.5 {
            push("Comfortable liquidity", 1, true);
        } else if cr < 1.0 {
            push("Strained liquidity", 2, false);
        }
    }

    let debt_to_equity = snapshot.and_then(|s| s.debt_to_equity);
    if let Some(de) = debt_to_equity {
        if de < 0.5 {
            push("Low leverage", 1, true);
        } else if de > 2.0 {
            push("High leverage", 2, false);
        }
    }

    // Insider activity: net signed transaction value over the window
    if let Some(trades) = insiders {
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
        if net > 0.0 {
            push("Net insider buying", 2, true);
        } else if net < 0.0 {
            push("Net insider selling", 1, false);
        }
    }

    // Analyst target vs. current price
    let target_price = estimates.and_then(|e| e.mean_price_target);
    let upside_percent = match (target_price, current_price) {
        (Some(target), Some(price)) if price > 0.0 => Some((target - price) / price * 100.0),
        _ => None,
    };
    if let Some(upside) = upside_percent {
        if upside > 15.0 {
            push("Consensus target implies upside", 2, true);
        } else if upside < -10.0 {
            push("Trading above consensus target", 2, false);
        }
    }

    let score: i32 = drivers
        .iter()
        .map(|d| if d.bullish { d.weight } else { -d.weight })
        .sum();

    let action = if score >= 6 {
        Action::Buy
    } else if score <= -4 {
        Action::Sell
    } else {
        Action::Hold
    };

    let risk = risk_rating(current_ratio, debt_to_equity, snapshot.and_then(|s| s.net_margin));

    Scorecard {
        action,
        score,
        risk,
        drivers,
        target_price,
        upside_percent,
    }
}

fn risk_rating(
    current_ratio: Option<f64>,
    debt_to_equity: Option<f64>,
    net_margin: Option<f64>,
) -> RiskRating {
    let strained = current_ratio.map(|c| c < 1.0).unwrap_or(false)
        || debt_to_equity.map(|d| d > 2.0).unwrap_or(false)
        || net_margin.map(|m| m < 0.0).unwrap_or(false);
    if strained {
        return RiskRating::High;
    }

    let solid = current_ratio.map(|c| c > 1.5).unwrap_or(false)
        && debt_to_equity.map(|d| d < 0.5).unwrap_or(false)
        && net_margin.map(|m| m > 0.10).unwrap_or(false);
    if solid {
        RiskRating::Low
    } else {
        RiskRating::Medium
    }
}
