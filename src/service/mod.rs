use std::sync::Arc;

use crate::repository::SubscriptionStore;
use crate::service::subscription_service::FightSubscriptionService;
use crate::source::StatusSource;

pub mod error;
pub mod fight_menu;
pub mod subscription_service;

pub struct Services {
    pub subscription: Arc<FightSubscriptionService>,
}

impl Services {
    pub fn new(store: Arc<dyn SubscriptionStore>, source: Arc<dyn StatusSource>) -> Self {
        Self {
            subscription: Arc::new(FightSubscriptionService::new(store, source)),
        }
    }
}
