use hyper::StatusCode;
use thiserror::Error;

/// Errors raised by the relay itself.
///
/// Upstream HTTP error statuses are not errors here: they are forwarded to
/// the client as regular responses.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Invalid request body: {0}")]
    InvalidRequestBody(#[from] serde_json::Error),

    #[error("Route not found: {0}")]
    NotFound(String),

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Upstream request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("Upstream timeout for {0}")]
    UpstreamTimeout(String),

    #[error("Failed to read upstream response body: {0}")]
    ResponseBodyError(String),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Status code reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::RequestBodyError(_) => StatusCode::BAD_REQUEST,
            RelayError::InvalidRequestBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::UpstreamRequestFailed(..) | RelayError::ResponseBodyError(_) => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RelayError::InvalidHeader(_)
            | RelayError::HttpClientError(_)
            | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
