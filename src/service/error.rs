use crate::repository::error::StoreError;
use crate::source::error::SourceError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("SourceError: {0}")]
    SourceError(#[from] SourceError),

    #[error("StoreError: {0}")]
    StoreError(#[from] StoreError),

    #[error("Event date `{value}` has an unexpected format: {source}")]
    TimeParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
