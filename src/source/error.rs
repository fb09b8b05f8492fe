#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Request to `{url}` returned HTTP {status}.")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse API response: {0}")]
    JsonParseFailed(#[from] serde_json::Error),

    #[error("No events listed by the source.")]
    NoEvents,

    #[error("Unexpected error: {message}")]
    UnexpectedResult { message: String },
}

impl From<wreq::Error> for SourceError {
    fn from(e: wreq::Error) -> Self {
        SourceError::RequestFailed(Box::new(e))
    }
}
