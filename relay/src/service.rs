use crate::errors::RelayError;
use crate::metrics_defs::REQUEST_DURATION;
use crate::notion::{NotionClient, UpstreamResponse};
use crate::task::{CreatePageBody, CreateTaskRequest, DatabaseQueryBody, ListTasksQuery};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Method, Request, Response};
use serde::Serialize;
use shared::histogram;
use shared::http::{full_body, make_json_response};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

pub const ADD_TASK_PATH: &str = "/add_task";
pub const LIST_TASKS_PATH: &str = "/list_tasks";

pub type RelayBody = BoxBody<Bytes, RelayError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Translates `/add_task` and `/list_tasks` into Notion calls and mirrors
/// Notion's status code and body back to the caller.
#[derive(Clone)]
pub struct RelayService {
    notion: NotionClient,
}

impl RelayService {
    pub fn new(notion: NotionClient) -> Self {
        Self { notion }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<RelayBody>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Display,
    {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let (handler, result) = match (&method, path.as_str()) {
            (&Method::POST, ADD_TASK_PATH) => ("add_task", self.add_task(req).await),
            (&Method::GET | &Method::HEAD, LIST_TASKS_PATH) => {
                let query = ListTasksQuery::from_query_string(req.uri().query());
                ("list_tasks", self.list_tasks(query).await)
            }
            (_, ADD_TASK_PATH | LIST_TASKS_PATH) => (
                "method_not_allowed",
                Err(RelayError::MethodNotAllowed {
                    method: method.to_string(),
                    path: path.clone(),
                }),
            ),
            _ => ("not_found", Err(RelayError::NotFound(path.clone()))),
        };

        let response = match result {
            Ok(upstream) => relay_response(upstream),
            Err(e) => error_response(handler, e),
        };

        histogram!(
            REQUEST_DURATION,
            "handler" => handler,
            "status" => response.status().as_str().to_string()
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    async fn add_task<B>(&self, req: Request<B>) -> Result<UpstreamResponse, RelayError>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Display,
    {
        let bytes = req
            .into_body()
            .collect()
            .await
            .map_err(|e| RelayError::RequestBodyError(e.to_string()))?
            .to_bytes();

        let task: CreateTaskRequest = serde_json::from_slice(&bytes)?;
        let body = CreatePageBody::for_task(self.notion.database_id(), &task);
        tracing::debug!(properties = body.properties.len(), "Creating task page");

        self.notion.create_page(&body).await
    }

    async fn list_tasks(&self, query: ListTasksQuery) -> Result<UpstreamResponse, RelayError> {
        tracing::debug!(category = ?query.category, "Listing tasks");

        self.notion
            .query_database(&DatabaseQueryBody::from(&query))
            .await
    }
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<RelayBody>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// Mirrors the upstream status and body. The body is passed through as
/// received; only the content type is carried over.
fn relay_response(upstream: UpstreamResponse) -> Response<RelayBody> {
    let mut response = Response::new(full_body(upstream.body));
    *response.status_mut() = upstream.status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        upstream
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/json")),
    );
    response
}

fn error_response(handler: &'static str, error: RelayError) -> Response<RelayBody> {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(handler, error = %error, "Request failed");
    } else {
        tracing::info!(handler, error = %error, "Rejected request");
    }

    make_json_response(
        status,
        &ErrorBody {
            error: error.to_string(),
        },
    )
}
