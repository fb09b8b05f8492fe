#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BotError {
    #[error("Malformed callback data `{data}`.")]
    MalformedCallback { data: String },

    #[error("Telegram request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to parse Telegram response: {0}")]
    JsonParseFailed(#[from] serde_json::Error),

    #[error("Telegram API error: {description}")]
    ApiError { description: String },
}

impl From<wreq::Error> for BotError {
    fn from(e: wreq::Error) -> Self {
        BotError::RequestFailed(Box::new(e))
    }
}
