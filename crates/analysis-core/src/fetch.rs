use serde::Serialize;

use crate::FetchError;

/// Result of a single provider fetch under the tagged-result policy: either
/// the payload, or an `{"error": message}` shape the pipeline can carry
/// forward without aborting.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Fetched<T> {
    Data(T),
    Error { error: String },
}

impl<T> Fetched<T> {
    pub fn from_result(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(data) => Fetched::Data(data),
            Err(e) => Fetched::Error {
                error: e.to_string(),
            },
        }
    }

    /// The payload, if the fetch succeeded. Stages read figures exclusively
    /// through this accessor, so an errored fetch can never contribute a
    /// number to a report.
    pub fn ok(&self) -> Option<&T> {
        match self {
            Fetched::Data(data) => Some(data),
            Fetched::Error { .. } => None,
        }
    }

    pub fn into_ok(self) -> Option<T> {
        match self {
            Fetched::Data(data) => Some(data),
            Fetched::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Fetched::Data(_) => None,
            Fetched::Error { error } => Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Fetched::Error { .. })
    }
}

impl<T> From<Result<T, FetchError>> for Fetched<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        Fetched::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_fetch_yields_no_payload() {
        let fetched: Fetched<Vec<f64>> =
            Fetched::from_result(Err(FetchError::Http("HTTP 500".to_string())));
        assert!(fetched.ok().is_none());
        assert!(fetched.is_error());
        assert_eq!(fetched.error(), Some("HTTP error: HTTP 500"));
    }

    #[test]
    fn error_serializes_as_tagged_shape() {
        let fetched: Fetched<Vec<f64>> =
            Fetched::from_result(Err(FetchError::MissingApiKey("FINANCIAL_DATASETS_API_KEY")));
        let json = serde_json::to_value(&fetched).unwrap();
        assert!(json.get("error").is_some());
    }

    #[test]
    fn data_serializes_verbatim() {
        let fetched = Fetched::Data(vec![1.0, 2.0]);
        let json = serde_json::to_value(&fetched).unwrap();
        assert_eq!(json, serde_json::json!([1.0, 2.0]));
    }
}
