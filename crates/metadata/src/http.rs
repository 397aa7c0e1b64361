//! HTTP feed provider.
//!
//! Plain feeds are fetched as-is. TMDB v3 endpoints
//! (https://developer.themoviedb.org/docs) get `api_key` and `language`
//! appended to whatever query the configured URL already carries.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use trendfeed_core::config::{FetchConfig, SourceConfig, SourceKind};

use crate::MetadataError;
use crate::provider::{FeedProvider, extract_items};

pub struct HttpFeedProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    language: String,
}

impl HttpFeedProvider {
    pub fn new(config: &FetchConfig) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("trendfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MetadataError::Network(format!("build HTTP client: {e}")))?;

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            api_key,
            language: config.language.clone(),
        })
    }

    async fn get_json(&self, source: &SourceConfig) -> Result<Value, MetadataError> {
        let mut request = self.client.get(&source.url);
        if source.kind == SourceKind::Tmdb {
            let api_key = self.api_key.as_deref().ok_or(MetadataError::MissingApiKey)?;
            request = request.query(&[("api_key", api_key), ("language", self.language.as_str())]);
        }

        debug!(source = %source.name, url = %source.url, "feed request");

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(MetadataError::Status(resp.status().as_u16()));
        }

        resp.json().await.map_err(MetadataError::from)
    }
}

#[async_trait::async_trait]
impl FeedProvider for HttpFeedProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<Value>, MetadataError> {
        let data = self.get_json(source).await?;
        extract_items(data)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::Json;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::json;

    use super::*;

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route(
                "/feed.json",
                get(|| async { Json(json!([{ "id": 1, "title": "A" }])) }),
            )
            .route(
                "/3/movie/popular",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "page": 1,
                        "results": [{
                            "id": 7,
                            "title": "B",
                            "api_key": params.get("api_key"),
                            "language": params.get("language"),
                            "region": params.get("region"),
                        }]
                    }))
                }),
            )
            .route(
                "/broken.json",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route("/garbage.json", get(|| async { "not json" }))
            .route(
                "/slow.json",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Json(json!([]))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provider(api_key: Option<&str>, timeout_secs: u64) -> HttpFeedProvider {
        HttpFeedProvider::new(&FetchConfig {
            timeout_secs,
            api_key: api_key.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_plain_feed() {
        let base = spawn_upstream().await;
        let source = SourceConfig::feed("feed", format!("{base}/feed.json"), None);
        let items = provider(None, 5).fetch(&source).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "A");
    }

    #[tokio::test]
    async fn tmdb_source_gets_key_and_language() {
        let base = spawn_upstream().await;
        let source = SourceConfig {
            name: "popular".into(),
            url: format!("{base}/3/movie/popular?region=CN"),
            kind: SourceKind::Tmdb,
            media_type: None,
        };
        let items = provider(Some("secret"), 5).fetch(&source).await.unwrap();
        assert_eq!(items[0]["api_key"], "secret");
        assert_eq!(items[0]["language"], "zh-CN");
        assert_eq!(items[0]["region"], "CN");
    }

    #[tokio::test]
    async fn tmdb_source_without_key_is_unavailable() {
        let base = spawn_upstream().await;
        let source = SourceConfig {
            name: "popular".into(),
            url: format!("{base}/3/movie/popular"),
            kind: SourceKind::Tmdb,
            media_type: None,
        };
        let err = provider(Some("  "), 5).fetch(&source).await.unwrap_err();
        assert!(matches!(err, MetadataError::MissingApiKey));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base = spawn_upstream().await;
        let source = SourceConfig::feed("broken", format!("{base}/broken.json"), None);
        let err = provider(None, 5).fetch(&source).await.unwrap_err();
        assert!(matches!(err, MetadataError::Status(500)));
    }

    #[tokio::test]
    async fn invalid_body_is_a_parse_error() {
        let base = spawn_upstream().await;
        let source = SourceConfig::feed("garbage", format!("{base}/garbage.json"), None);
        let err = provider(None, 5).fetch(&source).await.unwrap_err();
        assert!(matches!(err, MetadataError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let base = spawn_upstream().await;
        let source = SourceConfig::feed("slow", format!("{base}/slow.json"), None);
        let err = provider(None, 1).fetch(&source).await.unwrap_err();
        assert!(matches!(err, MetadataError::Timeout(_)), "got {err:?}");
    }
}
