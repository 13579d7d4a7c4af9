/// Failure of a call against the scene persistence API.
///
/// The local document is never modified when a call fails; there are no
/// automatic retries.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 404. `body` is the server's `detail`
    /// message when it sent one, the raw body otherwise.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Rejected locally before any request was issued.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
