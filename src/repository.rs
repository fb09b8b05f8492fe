//! Subscription storage: the [`SubscriptionStore`] contract, a SQLite
//! backend ([`Repository`]) and a volatile backend ([`memory::MemoryStore`]).

use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use log::debug;
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::entity::DueSubscription;
use crate::entity::RecipientId;
use crate::entity::RecipientSubscription;
use crate::entity::SubscriptionModel;
use crate::repository::error::StoreError;
use crate::repository::table::LinkTable;
use crate::repository::table::SubscriptionTable;
use crate::repository::table::TableBase;

pub mod error;
pub mod memory;
pub mod table;

/// Mapping from fight keys to interested recipients.
///
/// Every operation is atomic with respect to concurrent callers.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Creates the subscription if absent. The first writer's label and time win.
    async fn upsert_subscription(
        &self,
        key: &str,
        label: &str,
        start_time: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Links a recipient to a subscription. Idempotent.
    async fn add_recipient(&self, key: &str, recipient_id: RecipientId) -> Result<(), StoreError>;

    /// Every subscription whose start time is at or before `now`, in no particular order.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<DueSubscription>, StoreError>;

    async fn list_recipients(&self, key: &str) -> Result<Vec<RecipientId>, StoreError>;

    /// Atomically lists the recipients of `key` and removes the subscription.
    async fn take_recipients(&self, key: &str) -> Result<Vec<RecipientId>, StoreError>;

    /// Removes the subscription and all of its links. Idempotent.
    async fn remove_subscription(&self, key: &str) -> Result<(), StoreError>;

    /// Unlinks a recipient from every subscription labelled `label`.
    /// Returns the number of links removed.
    async fn remove_recipient_subscription(
        &self,
        recipient_id: RecipientId,
        label: &str,
    ) -> Result<u64, StoreError>;

    async fn list_for_recipient(
        &self,
        recipient_id: RecipientId,
    ) -> Result<Vec<RecipientSubscription>, StoreError>;

    /// Deletes subscriptions without recipients. Returns the number deleted.
    async fn prune_orphans(&self) -> Result<u64, StoreError>;
}

/// SQLite-backed subscription store.
pub struct Repository {
    pool: SqlitePool,
    pub subscription: SubscriptionTable,
    pub link: LinkTable,
}

impl Repository {
    /// Creates a new database connection and initializes table handlers.
    pub async fn new(db_url: &str, db_path: &str) -> anyhow::Result<Self> {
        let path = std::path::Path::new(db_path);
        if !path.exists() {
            debug!("Database path {db_path} does not exist. Creating...");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
            info!("Created {db_path}");
        }

        debug!("Connecting to db...");
        let opts = SqliteConnectOptions::from_str(db_url)?.foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;
        info!("Connected to db.");

        let subscription = SubscriptionTable::new(pool.clone());
        let link = LinkTable::new(pool.clone());

        Ok(Self {
            pool,
            subscription,
            link,
        })
    }

    /// Runs database migrations from the migrations directory.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Deletes all data from all tables. Use with caution!
    pub async fn delete_all_tables(&self) -> Result<(), StoreError> {
        self.link.delete_all().await?;
        self.subscription.delete_all().await?;
        Ok(())
    }

    /// The underlying connection pool, for ad hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SubscriptionStore for Repository {
    async fn upsert_subscription(
        &self,
        key: &str,
        label: &str,
        start_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let model = SubscriptionModel {
            key: key.to_string(),
            event_time: format_time(&start_time),
            fight_label: label.to_string(),
        };
        if !self.subscription.insert_or_ignore(&model).await? {
            debug!("Subscription {key} already exists, keeping the first record.");
        }
        Ok(())
    }

    async fn add_recipient(&self, key: &str, recipient_id: RecipientId) -> Result<(), StoreError> {
        self.link.insert_or_ignore(key, recipient_id).await?;
        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<DueSubscription>, StoreError> {
        let rows = self.subscription.select_due(&format_time(&now)).await?;
        Ok(rows
            .into_iter()
            .map(|row| DueSubscription {
                key: row.key,
                label: row.fight_label,
            })
            .collect())
    }

    async fn list_recipients(&self, key: &str) -> Result<Vec<RecipientId>, StoreError> {
        self.link.select_recipients(key).await
    }

    async fn take_recipients(&self, key: &str) -> Result<Vec<RecipientId>, StoreError> {
        self.subscription.delete_returning_recipients(key).await
    }

    async fn remove_subscription(&self, key: &str) -> Result<(), StoreError> {
        self.subscription.delete(key).await?;
        Ok(())
    }

    async fn remove_recipient_subscription(
        &self,
        recipient_id: RecipientId,
        label: &str,
    ) -> Result<u64, StoreError> {
        self.link
            .delete_by_recipient_and_label(recipient_id, label)
            .await
    }

    async fn list_for_recipient(
        &self,
        recipient_id: RecipientId,
    ) -> Result<Vec<RecipientSubscription>, StoreError> {
        self.subscription
            .select_by_recipient(recipient_id)
            .await?
            .into_iter()
            .map(|row| {
                Ok(RecipientSubscription {
                    start_time: parse_time(&row.event_time)?,
                    label: row.fight_label,
                })
            })
            .collect()
    }

    async fn prune_orphans(&self) -> Result<u64, StoreError> {
        self.subscription.delete_orphans().await
    }
}

/// Formats a time the way it is persisted, e.g. `2025-03-08T23:00:00Z`.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a persisted time.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| StoreError::TimeParse {
            value: value.to_string(),
            source,
        })
}
