#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("No subscription exists for key `{key}`.")]
    Referential { key: String },

    #[error("Stored time `{value}` is not a valid RFC 3339 timestamp: {source}")]
    TimeParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
