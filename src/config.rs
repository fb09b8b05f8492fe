use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::bot::telegram;
use crate::error::AppError;
use crate::source::espn_source;
use crate::task::walkout_poller::DEFAULT_POLL_INTERVAL;

/// Which [`SubscriptionStore`](crate::repository::SubscriptionStore) backend to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(AppError::InvalidConfig {
                key: "STORE_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    pub telegram_api_url: String,
    pub espn_api_url: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub store_backend: StoreBackend,
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
}

impl Config {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            telegram_token: std::env::var("TELEGRAM_TOKEN").map_err(|_| {
                AppError::MissingConfig {
                    key: "TELEGRAM_TOKEN".to_string(),
                }
            })?,
            telegram_api_url: env_or("TELEGRAM_API_URL", telegram::DEFAULT_API_URL),
            espn_api_url: env_or("ESPN_API_URL", espn_source::DEFAULT_API_URL),
            poll_interval: env_secs("POLL_INTERVAL", DEFAULT_POLL_INTERVAL),
            http_timeout: env_secs("HTTP_TIMEOUT", Duration::from_secs(15)),
            store_backend: std::env::var("STORE_BACKEND")
                .map_or(Ok(StoreBackend::default()), |v| v.parse())?,
            db_url: env_or("DB_URL", "sqlite://data/walkout.db"),
            db_path: env_or("DB_PATH", "data/walkout.db"),
            logs_path: PathBuf::from(env_or("LOGS_PATH", "logs")),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or(default.to_string())
}

/// Reads a whole number of seconds, falling back to `default` when unset or unparsable.
fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}
