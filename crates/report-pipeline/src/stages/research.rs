//! Stage 1: research
//!
//! News, press releases and sentiment for the resolved ticker. Produces the
//! opening fragment of the report.

use analysis_core::{NewsArticle, PipelineError, StockData};

use crate::context::StageContext;

const NEWS_LIMIT: u32 = 10;
const PRESS_RELEASE_LIMIT: u32 = 4;

pub async fn run(data: &dyn StockData, ctx: &StageContext) -> Result<String, PipelineError> {
    let ticker = ctx.ticker();

    let facts = data.company_facts(ticker).await?;
    let provider_news = data.company_news(ticker, NEWS_LIMIT).await?;
    let market_news = data.market_news(ticker, NEWS_LIMIT).await?;
    let releases = data.press_releases(ticker, PRESS_RELEASE_LIMIT).await?;

    let mut out = String::new();
    out.push_str(&format!("## Research Summary\n\n**Resolved ticker:** {ticker}\n\n"));

    match facts.ok() {
        Some(f) => {
            let name = f.name.as_deref().unwrap_or(ticker);
            let sector = f.sector.as_deref().unwrap_or("sector unknown");
            let industry = f.industry.as_deref().unwrap_or("industry unknown");
            let exchange = f.exchange.as_deref().unwrap_or("exchange unknown");
            out.push_str(&format!("{name} — {sector} / {industry}, listed on {exchange}.\n\n"));
        }
        None => out.push_str("Company profile unavailable.\n\n"),
    }

    out.push_str("### Recent News\n\n");
    let mut articles: Vec<&NewsArticle> = Vec::new();
    articles.extend(provider_news.ok().map(|v| v.iter()).into_iter().flatten());
    articles.extend(market_news.ok().map(|v| v.iter()).into_iter().flatten());
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    if articles.is_empty() {
        let reasons: Vec<&str> = [provider_news.error(), market_news.error()]
            .into_iter()
            .flatten()
            .collect();
        if reasons.is_empty() {
            out.push_str("No recent news found for this ticker.\n");
        } else {
            out.push_str(&format!("News unavailable ({}).\n", reasons.join("; ")));
        }
    } else {
        for article in articles.iter().take(NEWS_LIMIT as usize) {
            let date = article
                .published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "undated".to_string());
            let source = article.source.as_deref().unwrap_or("unknown source");
            out.push_str(&format!("- [{date}] {} ({source})\n", article.title));
        }
    }
    out.push('\n');

    out.push_str("### Market Sentiment\n\n");
    let (positive, negative, neutral) = sentiment_counts(&articles);
    if positive + negative + neutral == 0 {
        out.push_str("No tagged sentiment available for recent coverage.\n\n");
    } else {
        out.push_str(&format!(
            "Tagged coverage: {positive} positive, {negative} negative, {neutral} neutral.\n\n"
        ));
    }

    out.push_str("### Upcoming Catalysts\n\n");
    match releases.ok().filter(|r| !r.is_empty()) {
        Some(items) => {
            out.push_str("Most recent earnings communications:\n");
            for release in items {
                let date = release.date.as_deref().unwrap_or("undated");
                let title = release.title.as_deref().unwrap_or("(untitled release)");
                out.push_str(&format!("- [{date}] {title}\n"));
            }
        }
        None => out.push_str("No earnings press releases available.\n"),
    }

    Ok(out)
}

fn sentiment_counts(articles: &[&NewsArticle]) -> (usize, usize, usize) {
    let mut positive = 0;
    let mut negative = 0;
    let mut neutral = 0;
    for article in articles {
        match article.sentiment.as_deref() {
            Some("positive") => positive += 1,
            Some("negative") => negative += 1,
            Some("neutral") => neutral += 1,
            _ => {}
        }
    }
    (positive, negative, neutral)
}
