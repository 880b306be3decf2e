use thiserror::Error;

/// Errors talking to the GitHub REST API.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The request never produced a response.
    #[error("github request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GitHub answered with a non-2xx status. Not retried.
    #[error("github returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unable to decode github response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request headers could not be built.
    #[error("invalid request headers: {0}")]
    Headers(String),
}
