//! Sports-data status source: events, fights, fighters and fight status.

pub mod error;
pub mod espn_source;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;
use serde::Deserialize;

use crate::source::error::SourceError;

/// Date layout used by the provider for events, e.g. `2025-03-08T23:00Z`.
pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// A `{"$ref": "..."}` link to another provider resource.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ref {
    #[serde(rename = "$ref")]
    pub url: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct EventRefs {
    #[serde(default)]
    pub items: Vec<Ref>,
}

/// A fight card.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Event {
    pub id: String,
    /// Scheduled start, in [`EVENT_DATE_FORMAT`].
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "competitions", default)]
    pub fights: Vec<Fight>,
}

impl Event {
    /// Parses [`Event::date`] as a UTC instant.
    pub fn start_time(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        parse_event_time(&self.date)
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Fight {
    pub id: String,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
}

impl Fight {
    /// Athlete locators of this fight, in provider order.
    pub fn participant_locators(&self) -> Vec<&str> {
        self.competitors
            .iter()
            .filter_map(|c| c.athlete.as_ref())
            .map(|r| r.url.as_str())
            .collect()
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Competitor {
    #[serde(default)]
    pub athlete: Option<Ref>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Fighter {
    #[serde(rename = "fullName", default)]
    pub name: String,
}

/// Classified fight status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Scheduled,
    PreFight,
    /// Fighters are walking out: the fight is about to begin.
    WalkingOut,
    InProgress,
    Final,
    Other,
}

impl StatusKind {
    /// Maps a provider status type name to a [`StatusKind`].
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "STATUS_SCHEDULED" => StatusKind::Scheduled,
            "STATUS_PRE_FIGHT" => StatusKind::PreFight,
            "STATUS_FIGHTERS_WALKING" => StatusKind::WalkingOut,
            "STATUS_IN_PROGRESS" | "STATUS_END_OF_ROUND" | "STATUS_FIGHTERS_INTRODUCTION" => {
                StatusKind::InProgress
            }
            "STATUS_FINAL" => StatusKind::Final,
            _ => StatusKind::Other,
        }
    }

    /// Whether a new subscription can still be made.
    pub fn is_upcoming(&self) -> bool {
        matches!(self, StatusKind::Scheduled | StatusKind::PreFight)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FightStatus {
    pub kind: StatusKind,
    /// Raw provider type name, kept for logging.
    pub type_name: String,
}

impl FightStatus {
    pub fn from_type_name(name: impl Into<String>) -> Self {
        let type_name = name.into();
        Self {
            kind: StatusKind::from_type_name(&type_name),
            type_name,
        }
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct StatusPayload {
    #[serde(rename = "type")]
    pub status_type: StatusType,
}

#[derive(Deserialize, Debug)]
pub(crate) struct StatusType {
    pub name: String,
}

/// Read-only access to the sports-data provider.
///
/// Every call is independent and may run concurrently with any other.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// The nearest upcoming or current event, with its fights.
    async fn resolve_current_event(&self) -> Result<Event, SourceError>;

    async fn resolve_event(&self, event_id: &str) -> Result<Event, SourceError>;

    async fn resolve_fighter_name(&self, locator: &str) -> Result<String, SourceError>;

    async fn resolve_fight_status(&self, locator: &str) -> Result<FightStatus, SourceError>;

    /// Locator of the status resource of a fight. Used as the subscription key.
    fn status_locator(&self, event_id: &str, fight_id: &str) -> String;
}

/// Parses a provider event date such as `2025-03-08T23:00Z`.
pub fn parse_event_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(NaiveDateTime::parse_from_str(raw, EVENT_DATE_FORMAT)?.and_utc())
}
