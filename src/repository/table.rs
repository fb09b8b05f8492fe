//! Database table operations and implementations.

use sqlx::SqlitePool;
use sqlx::error::ErrorKind;

use crate::entity::RecipientId;
use crate::entity::SubscriptionModel;
use crate::repository::error::StoreError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), StoreError>;
}

macro_rules! impl_table_base {
    ($struct_name:ident, $table:expr) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn delete_all(&self) -> Result<(), StoreError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }
    };
}

// ============================================================================
// SubscriptionTable
// ============================================================================

impl_table_base!(SubscriptionTable, "subscriptions");

impl SubscriptionTable {
    /// Inserts the row unless the key already exists. Returns whether a row was written.
    pub async fn insert_or_ignore(&self, model: &SubscriptionModel) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "INSERT OR IGNORE INTO subscriptions (key, event_time, fight_label) VALUES (?, ?, ?)",
        )
        .bind(&model.key)
        .bind(&model.event_time)
        .bind(&model.fight_label)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn select(&self, key: &str) -> Result<Option<SubscriptionModel>, StoreError> {
        Ok(sqlx::query_as::<_, SubscriptionModel>(
            "SELECT key, event_time, fight_label FROM subscriptions WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    /// Rows whose `event_time` is at or before `now`.
    ///
    /// Times are stored in one fixed-width UTC layout, so text comparison is
    /// chronological.
    pub async fn select_due(&self, now: &str) -> Result<Vec<SubscriptionModel>, StoreError> {
        Ok(sqlx::query_as::<_, SubscriptionModel>(
            "SELECT key, event_time, fight_label FROM subscriptions WHERE event_time <= ?",
        )
        .bind(now)
        .fetch_all(&self.base.pool)
        .await?)
    }

    pub async fn select_by_recipient(
        &self,
        recipient_id: RecipientId,
    ) -> Result<Vec<SubscriptionModel>, StoreError> {
        Ok(sqlx::query_as::<_, SubscriptionModel>(
            r#"
            SELECT s.key, s.event_time, s.fight_label
            FROM subscriptions s
            JOIN link l ON s.key = l.key
            WHERE l.recipient_id = ?
            ORDER BY s.event_time, s.fight_label
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Deletes the row; links go with it through `ON DELETE CASCADE`.
    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM subscriptions WHERE key = ?")
            .bind(key)
            .execute(&self.base.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Deletes the row and returns the recipients that were linked to it,
    /// in a single transaction.
    pub async fn delete_returning_recipients(
        &self,
        key: &str,
    ) -> Result<Vec<RecipientId>, StoreError> {
        let mut tx = self.base.pool.begin().await?;

        let rows: Vec<(RecipientId,)> =
            sqlx::query_as("DELETE FROM link WHERE key = ? RETURNING recipient_id")
                .bind(key)
                .fetch_all(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM subscriptions WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut ids: Vec<RecipientId> = rows.into_iter().map(|(id,)| id).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Deletes every subscription without any link. Returns the number deleted.
    pub async fn delete_orphans(&self) -> Result<u64, StoreError> {
        let res = sqlx::query(
            "DELETE FROM subscriptions WHERE key NOT IN (SELECT DISTINCT key FROM link)",
        )
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected())
    }
}

// ============================================================================
// LinkTable
// ============================================================================

impl_table_base!(LinkTable, "link");

impl LinkTable {
    /// Links a recipient to an existing subscription.
    ///
    /// Fails with [`StoreError::Referential`] when the subscription is missing.
    pub async fn insert_or_ignore(
        &self,
        key: &str,
        recipient_id: RecipientId,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query("INSERT OR IGNORE INTO link (key, recipient_id) VALUES (?, ?)")
            .bind(key)
            .bind(recipient_id)
            .execute(&self.base.pool)
            .await;

        match res {
            Ok(res) => Ok(res.rows_affected() > 0),
            Err(sqlx::Error::Database(db_err))
                if matches!(db_err.kind(), ErrorKind::ForeignKeyViolation) =>
            {
                Err(StoreError::Referential {
                    key: key.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn select_recipients(&self, key: &str) -> Result<Vec<RecipientId>, StoreError> {
        let rows: Vec<(RecipientId,)> =
            sqlx::query_as("SELECT recipient_id FROM link WHERE key = ? ORDER BY recipient_id")
                .bind(key)
                .fetch_all(&self.base.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Removes the recipient's links to every subscription labelled `label`.
    pub async fn delete_by_recipient_and_label(
        &self,
        recipient_id: RecipientId,
        label: &str,
    ) -> Result<u64, StoreError> {
        let res = sqlx::query(
            r#"
            DELETE FROM link
            WHERE recipient_id = ?
            AND key IN (SELECT key FROM subscriptions WHERE fight_label = ?)
            "#,
        )
        .bind(recipient_id)
        .bind(label)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
