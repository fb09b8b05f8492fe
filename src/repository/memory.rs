//! In-process subscription store.
//!
//! All state lives behind one [`RwLock`]. Each operation takes a single guard
//! for its whole duration: a read guard for pure reads, a write guard for
//! anything that mutates. Contents are lost on restart.

use std::collections::BTreeSet;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::entity::DueSubscription;
use crate::entity::RecipientId;
use crate::entity::RecipientSubscription;
use crate::repository::SubscriptionStore;
use crate::repository::error::StoreError;

#[derive(Clone, Debug)]
struct Record {
    label: String,
    start_time: DateTime<Utc>,
}

/// A key's state. `record` is `None` when a recipient was linked before the
/// subscription itself was created.
#[derive(Default, Debug)]
struct Entry {
    record: Option<Record>,
    recipients: BTreeSet<RecipientId>,
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held, with or without a record.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn upsert_subscription(
        &self,
        key: &str,
        label: &str,
        start_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_string()).or_default();
        if entry.record.is_none() {
            entry.record = Some(Record {
                label: label.to_string(),
                start_time,
            });
        }
        Ok(())
    }

    async fn add_recipient(&self, key: &str, recipient_id: RecipientId) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .recipients
            .insert(recipient_id);
        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<DueSubscription>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter_map(|(key, entry)| {
                entry
                    .record
                    .as_ref()
                    .filter(|record| record.start_time <= now)
                    .map(|record| DueSubscription {
                        key: key.clone(),
                        label: record.label.clone(),
                    })
            })
            .collect())
    }

    async fn list_recipients(&self, key: &str) -> Result<Vec<RecipientId>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .map(|entry| entry.recipients.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn take_recipients(&self, key: &str) -> Result<Vec<RecipientId>, StoreError> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .map(|entry| entry.recipients.into_iter().collect())
            .unwrap_or_default())
    }

    async fn remove_subscription(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn remove_recipient_subscription(
        &self,
        recipient_id: RecipientId,
        label: &str,
    ) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        let mut emptied = Vec::new();

        for (key, entry) in entries.iter_mut() {
            let matches = entry
                .record
                .as_ref()
                .is_some_and(|record| record.label == label);
            if matches && entry.recipients.remove(&recipient_id) {
                removed += 1;
                if entry.recipients.is_empty() {
                    emptied.push(key.clone());
                }
            }
        }

        // Only entries emptied by this call go; a record still waiting for its
        // first recipient is left alone.
        for key in emptied {
            entries.remove(&key);
        }

        Ok(removed)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: RecipientId,
    ) -> Result<Vec<RecipientSubscription>, StoreError> {
        let entries = self.entries.read().await;
        let mut subs: Vec<RecipientSubscription> = entries
            .values()
            .filter(|entry| entry.recipients.contains(&recipient_id))
            .filter_map(|entry| entry.record.as_ref())
            .map(|record| RecipientSubscription {
                label: record.label.clone(),
                start_time: record.start_time,
            })
            .collect();
        subs.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.label.cmp(&b.label))
        });
        Ok(subs)
    }

    /// Drops entries that never received a record.
    ///
    /// Such an entry appears when a recipient is added right after the poller
    /// consumed the key. Entries emptied of recipients are already dropped
    /// inline by `remove_recipient_subscription`.
    async fn prune_orphans(&self) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.record.is_some());
        Ok((before - entries.len()) as u64)
    }
}
