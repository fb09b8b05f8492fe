//! Fight subscription management service.

use std::sync::Arc;

use log::debug;
use log::info;

use crate::entity::RecipientId;
use crate::entity::RecipientSubscription;
use crate::repository::SubscriptionStore;
use crate::repository::error::StoreError;
use crate::service::error::ServiceError;
use crate::service::fight_menu;
use crate::service::fight_menu::FightChoice;
use crate::source::Event;
use crate::source::StatusKind;
use crate::source::StatusSource;

/// Service for subscribing recipients to fights.
pub struct FightSubscriptionService {
    pub store: Arc<dyn SubscriptionStore>,
    pub source: Arc<dyn StatusSource>,
}

impl FightSubscriptionService {
    pub fn new(store: Arc<dyn SubscriptionStore>, source: Arc<dyn StatusSource>) -> Self {
        Self { store, source }
    }

    pub async fn current_event(&self) -> Result<Event, ServiceError> {
        Ok(self.source.resolve_current_event().await?)
    }

    /// Selectable fights of `event`, in display order.
    pub async fn fight_menu(&self, event: &Event) -> Vec<FightChoice> {
        fight_menu::build_fight_menu(self.source.clone(), event).await
    }

    /// Subscribes `recipient_id` to the chosen fight if it has not started yet.
    ///
    /// # Performance
    /// * Source calls: 2
    /// * DB calls: 2 (+2 if the subscription was pruned in between)
    #[tracing::instrument(skip(self, choice), fields(label = %choice.label))]
    pub async fn subscribe(
        &self,
        recipient_id: RecipientId,
        choice: &FightChoice,
    ) -> Result<SubscribeResult, ServiceError> {
        let event = self.source.resolve_event(&choice.event_id).await?;
        let start_time = event
            .start_time()
            .map_err(|source| ServiceError::TimeParse {
                value: event.date.clone(),
                source,
            })?;

        let key = self
            .source
            .status_locator(&choice.event_id, &choice.fight_id);
        let status = self.source.resolve_fight_status(&key).await?;
        debug!("Fight {key} has status {}.", status.type_name);

        match status.kind {
            StatusKind::Final => return Ok(SubscribeResult::AlreadyOver),
            StatusKind::WalkingOut => return Ok(SubscribeResult::AboutToStart),
            kind if !kind.is_upcoming() => return Ok(SubscribeResult::InProgress),
            _ => {}
        }

        self.store
            .upsert_subscription(&key, &choice.label, start_time)
            .await?;
        match self.store.add_recipient(&key, recipient_id).await {
            // Pruned between the two calls, create it again.
            Err(StoreError::Referential { .. }) => {
                self.store
                    .upsert_subscription(&key, &choice.label, start_time)
                    .await?;
                self.store.add_recipient(&key, recipient_id).await?;
            }
            res => res?,
        }

        info!("Recipient {recipient_id} subscribed to {}.", choice.label);
        Ok(SubscribeResult::Success {
            label: choice.label.clone(),
        })
    }

    pub async fn list_subscriptions(
        &self,
        recipient_id: RecipientId,
    ) -> Result<Vec<RecipientSubscription>, ServiceError> {
        Ok(self.store.list_for_recipient(recipient_id).await?)
    }

    pub async fn unsubscribe(
        &self,
        recipient_id: RecipientId,
        label: &str,
    ) -> Result<UnsubscribeResult, ServiceError> {
        let removed = self
            .store
            .remove_recipient_subscription(recipient_id, label)
            .await?;

        if removed == 0 {
            return Ok(UnsubscribeResult::NoneSubscribed {
                label: label.to_string(),
            });
        }
        info!("Recipient {recipient_id} unsubscribed from {label}.");
        Ok(UnsubscribeResult::Success {
            label: label.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeResult {
    Success { label: String },
    AlreadyOver,
    AboutToStart,
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeResult {
    Success { label: String },
    NoneSubscribed { label: String },
}
