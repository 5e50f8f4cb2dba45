/// Accumulated output of completed stages plus the resolved ticker.
/// Owned by the orchestrator and handed to each stage in turn; stages run
/// one at a time, so there is no concurrent mutation.
#[derive(Debug, Clone)]
pub struct StageContext {
    ticker: String,
    fragments: Vec<String>,
}

impl StageContext {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            fragments: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn push_fragment(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// The full report: completed fragments joined in stage order.
    pub fn combined(&self) -> String {
        self.fragments.join("\n\n---\n\n")
    }
}
