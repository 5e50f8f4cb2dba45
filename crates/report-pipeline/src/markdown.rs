//! Markdown rendering helpers
//!
//! Every formatter renders an absent figure as [`NA`]. Stages never format
//! numbers directly, which is what keeps errored fetches from ever turning
//! into figures in a report.

/// Marker for a figure whose backing fetch failed or omitted it.
pub const NA: &str = "n/a";

/// Plain number, up to two decimals, trailing zeros trimmed.
pub fn num(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let s = format!("{v:.2}");
            let s = s.trim_end_matches('0').trim_end_matches('.');
            s.to_string()
        }
        None => NA.to_string(),
    }
}

/// Fraction rendered as a percentage (0.255 -> "25.5%").
pub fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}%", num(Some(v * 100.0))),
        None => NA.to_string(),
    }
}

/// Percentage that is already in percent units (25.5 -> "25.5%").
pub fn pct_raw(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}%", num(Some(v))),
        None => NA.to_string(),
    }
}

/// Currency amount with a thousands suffix ($1.23B, $45.6M).
pub fn money(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let abs = v.abs();
            let (scaled, suffix) = if abs >= 1e12 {
                (v / 1e12, "T")
            } else if abs >= 1e9 {
                (v / 1e9, "B")
            } else if abs >= 1e6 {
                (v / 1e6, "M")
            } else if abs >= 1e3 {
                (v / 1e3, "K")
            } else {
                (v, "")
            };
            format!("${}{}", num(Some(scaled)), suffix)
        }
        None => NA.to_string(),
    }
}

/// A markdown table from a header row and data rows.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    out.push_str(&format!(
        "|{}\n",
        headers.iter().map(|_| "---|").collect::<String>()
    ));
    for row in rows {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}
