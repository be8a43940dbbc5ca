use crate::config::{Config, NotionConfig};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderMap};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// A request captured by [`MockUpstream`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is json")
    }
}

/// Stand-in for the Notion API. Answers every request with a fixed status
/// and JSON body and records what it received.
pub struct MockUpstream {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn start(status: StatusCode, body: serde_json::Value) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    /// Like [`MockUpstream::start`], but waits `delay` after recording each
    /// request before answering.
    pub async fn start_with_delay(
        status: StatusCode,
        body: serde_json::Value,
        delay: Duration,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let body = Bytes::from(serde_json::to_vec(&body).unwrap());

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let recorded = recorded.clone();
                let body = body.clone();

                tokio::spawn(async move {
                    let handler = service_fn(move |req: Request<Incoming>| {
                        let recorded = recorded.clone();
                        let body = body.clone();
                        async move {
                            let (parts, req_body) = req.into_parts();
                            let req_bytes = req_body
                                .collect()
                                .await
                                .map(|collected| collected.to_bytes())
                                .unwrap_or_default();

                            recorded.lock().unwrap().push(RecordedRequest {
                                method: parts.method.to_string(),
                                path: parts.uri.path().to_string(),
                                headers: parts.headers,
                                body: req_bytes,
                            });

                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }

                            let mut response = Response::new(Full::new(body));
                            *response.status_mut() = status;
                            response
                                .headers_mut()
                                .insert(CONTENT_TYPE, "application/json".parse().unwrap());
                            Ok::<_, Infallible>(response)
                        }
                    });

                    if let Err(err) =
                        hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                            .serve_connection(io, handler)
                            .await
                    {
                        eprintln!("Error serving connection: {:?}", err);
                    }
                });
            }
        });

        MockUpstream { port, requests }
    }

    /// Base url the relay should treat as the Notion API root.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/v1", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Asserts exactly one request was received and returns it.
    pub fn single_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected one upstream request");
        requests.into_iter().next().unwrap()
    }
}

pub fn notion_config(base_url: &str) -> NotionConfig {
    NotionConfig {
        base_url: Url::parse(base_url).unwrap(),
        token: "secret_test".into(),
        database_id: "db123".into(),
        ..Default::default()
    }
}

pub fn relay_config(base_url: &str) -> Config {
    Config {
        notion: notion_config(base_url),
        ..Default::default()
    }
}
