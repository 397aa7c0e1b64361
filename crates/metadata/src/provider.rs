use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};
use trendfeed_core::config::SourceConfig;

use crate::MetadataError;

/// Something that can turn a configured source into raw upstream records.
#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the records of one source.
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<Value>, MetadataError>;
}

/// Result of fetching one source. A failed source contributes no items.
#[derive(Debug)]
pub struct FetchOutcome {
    pub source: String,
    pub result: Result<Vec<Value>, MetadataError>,
}

impl FetchOutcome {
    pub fn items(&self) -> &[Value] {
        match &self.result {
            Ok(items) => items,
            Err(_) => &[],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetch all sources concurrently.
///
/// Outcomes come back in the same order as `sources`, whatever order the
/// requests finish in.
pub async fn fetch_all(provider: &dyn FeedProvider, sources: &[&SourceConfig]) -> Vec<FetchOutcome> {
    let requests = sources.iter().map(|source| async move {
        let result = provider.fetch(source).await;
        match &result {
            Ok(items) => info!(
                provider = provider.name(),
                source = %source.name,
                items = items.len(),
                "fetched source"
            ),
            Err(e) => warn!(
                provider = provider.name(),
                source = %source.name,
                url = %source.url,
                error = %e,
                "source unavailable"
            ),
        }
        FetchOutcome {
            source: source.name.clone(),
            result,
        }
    });

    join_all(requests).await
}

/// Accept either a bare JSON array or a TMDB-style `{"results": [...]}` object.
pub fn extract_items(data: Value) -> Result<Vec<Value>, MetadataError> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(MetadataError::Parse(
                "object response has no `results` array".to_string(),
            )),
        },
        other => Err(MetadataError::Parse(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    /// Serves canned responses; sources named `broken*` fail.
    struct CannedProvider;

    #[async_trait::async_trait]
    impl FeedProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn fetch(&self, source: &SourceConfig) -> Result<Vec<Value>, MetadataError> {
            if source.name.starts_with("broken") {
                return Err(MetadataError::Status(500));
            }
            // Finish in reverse declaration order.
            if source.name == "slow" {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(vec![json!({ "title": source.name })])
        }
    }

    fn source(name: &str) -> SourceConfig {
        SourceConfig::feed(name, format!("http://upstream/{name}.json"), None)
    }

    #[tokio::test]
    async fn outcomes_keep_source_order() {
        let slow = source("slow");
        let fast = source("fast");
        let outcomes = fetch_all(&CannedProvider, &[&slow, &fast]).await;
        let names: Vec<&str> = outcomes.iter().map(|o| o.source.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
        assert_eq!(outcomes[0].items()[0]["title"], "slow");
    }

    #[tokio::test]
    async fn failed_source_contributes_nothing() {
        let ok = source("ok");
        let broken = source("broken");
        let outcomes = fetch_all(&CannedProvider, &[&ok, &broken]).await;
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[1].items().is_empty());
        assert!(matches!(outcomes[1].result, Err(MetadataError::Status(500))));
    }

    #[test]
    fn extract_items_accepts_both_shapes() {
        let bare = extract_items(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped = extract_items(json!({ "page": 1, "results": [{ "id": 3 }] })).unwrap();
        assert_eq!(wrapped[0]["id"], 3);
    }

    #[test]
    fn extract_items_rejects_other_shapes() {
        assert!(matches!(
            extract_items(json!({ "status_message": "Invalid API key" })),
            Err(MetadataError::Parse(_))
        ));
        let err = extract_items(json!("nope")).unwrap_err();
        assert!(err.to_string().contains("a string"));
    }
}
