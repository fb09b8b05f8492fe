//! ESPN core API status source for UFC events.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use serde::de::DeserializeOwned;
use wreq::Client;
use wreq::header::HeaderMap;
use wreq::header::HeaderValue;
use wreq::header::USER_AGENT;

use crate::source::Event;
use crate::source::EventRefs;
use crate::source::FightStatus;
use crate::source::Fighter;
use crate::source::StatusPayload;
use crate::source::StatusSource;
use crate::source::error::SourceError;

pub const DEFAULT_API_URL: &str = "http://sports.core.api.espn.com/v2/sports/mma/leagues/ufc";

/// Requests per second allowed towards the provider.
const REQUESTS_PER_SECOND: u32 = 10;

pub struct EspnSource {
    /// League base url, e.g. [`DEFAULT_API_URL`].
    pub api_url: String,
    client: Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl EspnSource {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("walkout-bot/0.1"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let quota = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
            limiter: RateLimiter::direct(Quota::per_second(quota)),
        })
    }

    /// Takes exactly one cell from the limiter, waiting for it if needed.
    async fn wait_for_permit(&self) {
        // A failed check takes nothing.
        if self.limiter.check().is_err() {
            info!("ESPN source is ratelimited. Waiting...");
            self.limiter.until_ready().await;
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        self.wait_for_permit().await;

        debug!("Making request to: {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.api_url)
    }
}

#[async_trait]
impl StatusSource for EspnSource {
    async fn resolve_current_event(&self) -> Result<Event, SourceError> {
        let refs: EventRefs = self.fetch(&self.events_url()).await?;
        let first = refs.items.first().ok_or(SourceError::NoEvents)?;
        self.fetch(&first.url).await
    }

    async fn resolve_event(&self, event_id: &str) -> Result<Event, SourceError> {
        self.fetch(&format!("{}/{}", self.events_url(), event_id))
            .await
    }

    async fn resolve_fighter_name(&self, locator: &str) -> Result<String, SourceError> {
        let fighter: Fighter = self.fetch(locator).await?;
        if fighter.name.trim().is_empty() {
            return Err(SourceError::UnexpectedResult {
                message: format!("Athlete at `{locator}` has no name."),
            });
        }
        Ok(fighter.name)
    }

    async fn resolve_fight_status(&self, locator: &str) -> Result<FightStatus, SourceError> {
        let payload: StatusPayload = self.fetch(locator).await?;
        Ok(FightStatus::from_type_name(payload.status_type.name))
    }

    fn status_locator(&self, event_id: &str, fight_id: &str) -> String {
        format!(
            "{}/{}/competitions/{}/status?lang=en&region=us",
            self.events_url(),
            event_id,
            fight_id
        )
    }
}
