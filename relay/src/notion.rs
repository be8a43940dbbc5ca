use crate::config::NotionConfig;
use crate::errors::RelayError;
use crate::metrics_defs::{UPSTREAM_ERRORS, UPSTREAM_REQUESTS};
use crate::task::{CreatePageBody, DatabaseQueryBody};
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use hyper::StatusCode;
use hyper::body::Bytes;
use serde::Serialize;
use shared::counter;
use std::time::Duration;
use url::Url;

/// Response received from Notion, kept as raw bytes so it can be relayed
/// without re-encoding.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Client for the two Notion endpoints the relay uses.
///
/// Holds the static header set and a pooled `reqwest::Client`; cheap to clone.
#[derive(Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: Url,
    database_id: String,
}

impl NotionClient {
    pub fn new(config: &NotionConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::HttpClientError(e.to_string()))?;

        Ok(NotionClient {
            client,
            base_url: config.base_url.clone(),
            database_id: config.database_id.clone(),
        })
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// `POST {base}/pages`
    pub async fn create_page(&self, body: &CreatePageBody) -> Result<UpstreamResponse, RelayError> {
        self.post("pages", self.endpoint(&["pages"]), body).await
    }

    /// `POST {base}/databases/{database_id}/query`, first page only.
    pub async fn query_database(
        &self,
        body: &DatabaseQueryBody,
    ) -> Result<UpstreamResponse, RelayError> {
        let url = self.endpoint(&["databases", self.database_id.as_str(), "query"]);
        self.post("databases.query", url, body).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Only fails for cannot-be-a-base urls, which config validation rejects.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        url: Url,
        body: &T,
    ) -> Result<UpstreamResponse, RelayError> {
        let upstream = url.host_str().unwrap_or(url.as_str()).to_string();
        tracing::debug!(endpoint, url = %url, "Sending upstream request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                counter!(UPSTREAM_ERRORS, "endpoint" => endpoint).increment(1);
                transport_error(&upstream, e)
            })?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        counter!(
            UPSTREAM_REQUESTS,
            "endpoint" => endpoint,
            "status" => status.as_str().to_string()
        )
        .increment(1);

        let body = response.bytes().await.map_err(|e| {
            counter!(UPSTREAM_ERRORS, "endpoint" => endpoint).increment(1);
            if e.is_timeout() {
                RelayError::UpstreamTimeout(upstream.clone())
            } else {
                RelayError::ResponseBodyError(e.to_string())
            }
        })?;

        if !status.is_success() {
            tracing::info!(
                endpoint,
                status = status.as_u16(),
                "Upstream returned an error status"
            );
        }

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

fn default_headers(config: &NotionConfig) -> Result<HeaderMap, RelayError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
        .map_err(|_| RelayError::InvalidHeader("Authorization"))?;
    auth.set_sensitive(true);

    let version = HeaderValue::from_str(&config.version)
        .map_err(|_| RelayError::InvalidHeader("Notion-Version"))?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(HeaderName::from_static("notion-version"), version);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn transport_error(upstream: &str, e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        RelayError::UpstreamTimeout(upstream.to_string())
    } else {
        RelayError::UpstreamRequestFailed(upstream.to_string(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{CreateTaskRequest, ListTasksQuery};
    use crate::testutils::{MockUpstream, notion_config};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_page_sends_headers_and_body() {
        let upstream = MockUpstream::start(StatusCode::OK, json!({"object": "page"})).await;
        let client = NotionClient::new(&notion_config(&upstream.base_url())).unwrap();

        let task = CreateTaskRequest {
            title: "Buy milk".into(),
            ..Default::default()
        };
        let response = client
            .create_page(&CreatePageBody::for_task(client.database_id(), &task))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), br#"{"object":"page"}"#);

        let recorded = upstream.single_request();
        assert_eq!(recorded.method, "POST");
        assert_eq!(recorded.path, "/v1/pages");
        assert_eq!(recorded.header("authorization"), Some("Bearer secret_test"));
        assert_eq!(recorded.header("notion-version"), Some("2022-06-28"));
        assert_eq!(recorded.header("content-type"), Some("application/json"));
        assert_eq!(
            recorded.json(),
            json!({
                "parent": {"database_id": "db123"},
                "properties": {"Name": {"title": [{"text": {"content": "Buy milk"}}]}}
            })
        );
    }

    #[tokio::test]
    async fn test_query_database_path() {
        let upstream = MockUpstream::start(StatusCode::OK, json!({"results": []})).await;
        let client = NotionClient::new(&notion_config(&upstream.base_url())).unwrap();

        client
            .query_database(&DatabaseQueryBody::from(&ListTasksQuery::default()))
            .await
            .unwrap();

        let recorded = upstream.single_request();
        assert_eq!(recorded.path, "/v1/databases/db123/query");
        assert_eq!(recorded.json(), json!({"page_size": 100}));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let mut config = notion_config("https://api.notion.com/v1/");
        config.database_id = "a b".into();
        let client = NotionClient::new(&config).unwrap();

        assert_eq!(
            client.endpoint(&["pages"]).as_str(),
            "https://api.notion.com/v1/pages"
        );
        assert_eq!(
            client.endpoint(&["databases", "a b", "query"]).as_str(),
            "https://api.notion.com/v1/databases/a%20b/query"
        );
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut config = notion_config("https://api.notion.com/v1");
        config.token = "bad\ntoken".into();
        assert!(matches!(
            NotionClient::new(&config),
            Err(RelayError::InvalidHeader("Authorization"))
        ));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let upstream = MockUpstream::start_with_delay(
            StatusCode::OK,
            json!({"results": []}),
            Duration::from_secs(3),
        )
        .await;
        let mut config = notion_config(&upstream.base_url());
        config.timeout_secs = 1;
        let client = NotionClient::new(&config).unwrap();

        let result = client
            .query_database(&DatabaseQueryBody::from(&ListTasksQuery::default()))
            .await;

        assert!(matches!(
            result,
            Err(RelayError::UpstreamTimeout(host)) if host == "127.0.0.1"
        ));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        // Bind and drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client =
            NotionClient::new(&notion_config(&format!("http://127.0.0.1:{port}/v1"))).unwrap();
        let result = client
            .query_database(&DatabaseQueryBody::from(&ListTasksQuery::default()))
            .await;

        assert!(matches!(
            result,
            Err(RelayError::UpstreamRequestFailed(host, _)) if host == "127.0.0.1"
        ));
    }
}
