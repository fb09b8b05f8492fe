use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;

/// Chat identifier of a notification recipient.
pub type RecipientId = i64;

/// A subscription whose start time has passed and is eligible for polling.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DueSubscription {
    pub key: String,
    pub label: String,
}

/// A subscription as seen by one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientSubscription {
    pub label: String,
    pub start_time: DateTime<Utc>,
}

/// Row of the `subscriptions` table. `event_time` is an RFC 3339 string.
#[derive(FromRow, Default, Clone, Debug)]
pub struct SubscriptionModel {
    pub key: String,
    pub event_time: String,
    pub fight_label: String,
}

