/// Errors raised while querying the book search API.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BooksApiError {
    /// The HTTP request itself failed, originating from `reqwest`
    #[error("request to the book search API failed: {0}")]
    Fetch(#[from] reqwest::Error),
    /// The API answered with a non-success status code
    #[error("book search API returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body was not the expected JSON, originating from `serde_json`
    #[error("failed to decode book search response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The HTTP client could not be constructed
    #[error("{0}")]
    Client(String),
}
