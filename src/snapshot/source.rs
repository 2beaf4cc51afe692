use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, USER_AGENT};
use crate::error::SnapshotFetchError;

/// Marker preceding the embedded state document in a search results page.
const STATE_MARKER: &str = "window.initialState";

/// Produces the raw snapshot document for one query term. The scanner does
/// not care how the document is obtained, only its shape.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Value, SnapshotFetchError>;
}

/// Fetches the server-rendered search page and lifts the embedded state
/// document out of it. Requests only the document itself; no assets, no cache.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    marketplace_url: String,
}

impl HttpSnapshotSource {
    pub fn new(cfg: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(cfg.snapshot_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            marketplace_url: cfg.marketplace_url.clone(),
        })
    }

    /// Search URL sorted newest-first.
    pub fn search_url(&self, query: &str) -> String {
        search_url(&self.marketplace_url, query)
    }
}

pub fn search_url(marketplace_url: &str, query: &str) -> String {
    format!(
        "{}/search/{}?sort_by=time_created%2Cdescending",
        marketplace_url,
        urlencoding::encode(query)
    )
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self, query: &str) -> Result<Value, SnapshotFetchError> {
        let url = self.search_url(query);
        debug!(%url, "fetching search page");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SnapshotFetchError::Status(status.as_u16()));
        }

        let html = resp.text().await?;
        extract_initial_state(&html)
    }
}

/// Parse the first JSON value assigned to `window.initialState` in the page.
/// Anything after the value (`;</script>` and the rest of the page) is ignored.
pub fn extract_initial_state(html: &str) -> Result<Value, SnapshotFetchError> {
    let start = html
        .find(STATE_MARKER)
        .ok_or(SnapshotFetchError::MissingState)?;
    let rest = &html[start + STATE_MARKER.len()..];
    let rest = rest
        .trim_start()
        .strip_prefix('=')
        .ok_or(SnapshotFetchError::MissingState)?;

    let mut values = serde_json::Deserializer::from_str(rest.trim_start()).into_iter::<Value>();
    match values.next() {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(SnapshotFetchError::Json(e)),
        None => Err(SnapshotFetchError::MissingState),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{Html, IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;

    use crate::config::test_config;

    const STATE_PAGE: &str = concat!(
        r#"<html><script>window.initialState = "#,
        r#"{"SearchListing":{"listingCards":[]}};</script></html>"#,
    );

    /// Local stand-in for the marketplace search page. Only `lego star wars` is served;
    /// every other term gets the bot wall.
    async fn spawn_marketplace() -> String {
        async fn search(
            Path(query): Path<String>,
            Query(params): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> Response {
            let sorted =
                params.get("sort_by").map(String::as_str) == Some("time_created,descending");
            let agent = headers.get("user-agent").and_then(|v| v.to_str().ok());
            if query == "lego star wars" && sorted && agent == Some(USER_AGENT) {
                Html(STATE_PAGE).into_response()
            } else {
                (StatusCode::SERVICE_UNAVAILABLE, "blocked").into_response()
            }
        }

        let app = Router::new().route("/search/:query", get(search));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn source(marketplace_url: &str) -> HttpSnapshotSource {
        let cfg = test_config(&["lego star wars"], marketplace_url, "http://unused.invalid");
        HttpSnapshotSource::new(&cfg).unwrap()
    }

    #[test]
    fn lifts_state_out_of_script_tag() {
        let v = extract_initial_state(STATE_PAGE).unwrap();
        assert!(v["SearchListing"]["listingCards"].as_array().unwrap().is_empty());
    }

    #[test]
    fn page_without_marker_is_missing_state() {
        let err = extract_initial_state("<html><body>captcha</body></html>").unwrap_err();
        assert!(matches!(err, SnapshotFetchError::MissingState));
    }

    #[test]
    fn truncated_state_is_json_error() {
        let err = extract_initial_state(r#"window.initialState={"SearchListing":"#).unwrap_err();
        assert!(matches!(err, SnapshotFetchError::Json(_)));
    }

    #[test]
    fn search_url_encodes_query() {
        assert_eq!(
            search_url("https://sg.carousell.com", "herman miller aeron"),
            "https://sg.carousell.com/search/herman%20miller%20aeron\
             ?sort_by=time_created%2Cdescending"
        );
    }

    #[tokio::test]
    async fn fetch_returns_embedded_state() {
        let base = spawn_marketplace().await;
        let v = source(&base).fetch("lego star wars").await.unwrap();
        assert!(v["SearchListing"]["listingCards"].is_array());
    }

    #[tokio::test]
    async fn non_success_page_maps_to_status() {
        let base = spawn_marketplace().await;
        let err = source(&base).fetch("nintendo switch").await.unwrap_err();
        assert!(matches!(err, SnapshotFetchError::Status(503)), "got {err:?}");
    }
}
