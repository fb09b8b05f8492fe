//! Routes chat updates to the subscription service and replies through a [`Notifier`].

use std::sync::Arc;

use log::debug;
use log::error;
use log::warn;

use crate::bot::callback::CallbackToken;
use crate::bot::callback::MenuAction;
use crate::bot::telegram::CallbackQuery;
use crate::bot::telegram::Message;
use crate::bot::telegram::Update;
use crate::bot::views;
use crate::entity::RecipientId;
use crate::notifier::Notifier;
use crate::notifier::OutgoingMessage;
use crate::service::Services;
use crate::service::error::ServiceError;
use crate::service::fight_menu::FightChoice;

pub struct Dispatcher {
    services: Arc<Services>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(services: Arc<Services>, notifier: Arc<dyn Notifier>) -> Self {
        Self { services, notifier }
    }

    pub async fn handle_update(&self, update: &Update) {
        if let Some(message) = &update.message {
            self.handle_message(message).await;
        } else if let Some(query) = &update.callback_query {
            self.handle_callback(query).await;
        } else {
            debug!("Ignoring update {} with no message.", update.update_id);
        }
    }

    pub async fn handle_message(&self, message: &Message) {
        let chat_id = message.chat.id;
        let reply = match message.command() {
            Some("start") => views::main_menu(),
            Some(command) => {
                debug!("Unknown command /{command} from {chat_id}.");
                views::unknown_command()
            }
            None => views::unknown_message(),
        };
        self.reply(chat_id, reply).await;
    }

    /// Handles a menu button press. Malformed tokens are logged and ignored.
    pub async fn handle_callback(&self, query: &CallbackQuery) {
        let Some(data) = query.data.as_deref() else {
            debug!("Callback {} carries no data.", query.id);
            return;
        };
        let chat_id = query
            .message
            .as_ref()
            .map_or(query.from.id, |m| m.chat.id);

        let token = match data.parse::<CallbackToken>() {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring callback from {}: {e}", query.from.display_name());
                return;
            }
        };

        let reply = match token {
            CallbackToken::Action(MenuAction::Start) => views::main_menu(),
            CallbackToken::Action(MenuAction::Subscribe) => self.fight_selection().await,
            CallbackToken::Action(MenuAction::View) => self.subscriptions_list(chat_id).await,
            CallbackToken::Action(MenuAction::Remove) => self.remove_menu(chat_id).await,
            CallbackToken::Fight(choice) => self.subscribe(chat_id, &choice).await,
            CallbackToken::Remove { label } => self.unsubscribe(chat_id, &label).await,
        };
        self.reply(chat_id, reply).await;
    }

    async fn fight_selection(&self) -> OutgoingMessage {
        let service = &self.services.subscription;
        let event = match service.current_event().await {
            Ok(event) => event,
            Err(e) => return Self::failure("fetch the upcoming event", &e),
        };
        let choices = service.fight_menu(&event).await;
        views::fight_selection(&event.name, &choices)
    }

    async fn subscribe(&self, chat_id: RecipientId, choice: &FightChoice) -> OutgoingMessage {
        match self.services.subscription.subscribe(chat_id, choice).await {
            Ok(result) => views::subscribe_result(&result),
            Err(e) => Self::failure("subscribe to the fight", &e),
        }
    }

    async fn unsubscribe(&self, chat_id: RecipientId, label: &str) -> OutgoingMessage {
        match self.services.subscription.unsubscribe(chat_id, label).await {
            Ok(result) => views::unsubscribe_result(&result),
            Err(e) => Self::failure("remove the subscription", &e),
        }
    }

    async fn subscriptions_list(&self, chat_id: RecipientId) -> OutgoingMessage {
        match self.services.subscription.list_subscriptions(chat_id).await {
            Ok(subs) => views::subscriptions_list(&subs),
            Err(e) => Self::failure("fetch your subscriptions", &e),
        }
    }

    async fn remove_menu(&self, chat_id: RecipientId) -> OutgoingMessage {
        match self.services.subscription.list_subscriptions(chat_id).await {
            Ok(subs) => views::remove_menu(&subs),
            Err(e) => Self::failure("fetch your subscriptions", &e),
        }
    }

    fn failure(action: &str, error: &ServiceError) -> OutgoingMessage {
        error!("Failed to {action}: {error}");
        views::failure(action)
    }

    async fn reply(&self, chat_id: RecipientId, message: OutgoingMessage) {
        if let Err(e) = self.notifier.send(chat_id, message).await {
            error!("Failed to reply to {chat_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::bot::telegram::Chat;
    use crate::bot::telegram::User;
    use crate::notifier::MockNotifier;
    use crate::repository::SubscriptionStore;
    use crate::repository::memory::MemoryStore;
    use crate::source::Event;
    use crate::source::FightStatus;
    use crate::source::StatusSource;
    use crate::source::error::SourceError;

    /// Source whose fights are always scheduled, or always failing.
    struct StubSource {
        failing: bool,
    }

    #[async_trait]
    impl StatusSource for StubSource {
        async fn resolve_current_event(&self) -> Result<Event, SourceError> {
            Err(SourceError::NoEvents)
        }

        async fn resolve_event(&self, event_id: &str) -> Result<Event, SourceError> {
            if self.failing {
                return Err(SourceError::NoEvents);
            }
            Ok(Event {
                id: event_id.to_string(),
                date: "2030-01-02T03:00Z".to_string(),
                name: "UFC 500".to_string(),
                fights: Vec::new(),
            })
        }

        async fn resolve_fighter_name(&self, locator: &str) -> Result<String, SourceError> {
            Ok(locator.to_string())
        }

        async fn resolve_fight_status(&self, _locator: &str) -> Result<FightStatus, SourceError> {
            Ok(FightStatus::from_type_name("STATUS_SCHEDULED"))
        }

        fn status_locator(&self, event_id: &str, fight_id: &str) -> String {
            format!("status/{event_id}/{fight_id}")
        }
    }

    /// Builds a dispatcher whose replies are collected into the returned vector.
    fn dispatcher(
        failing: bool,
    ) -> (
        Dispatcher,
        Arc<MemoryStore>,
        Arc<Mutex<Vec<(RecipientId, OutgoingMessage)>>>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = MockNotifier::new();
        let sink = sent.clone();
        notifier.expect_send().returning(move |recipient, message| {
            sink.lock().unwrap().push((recipient, message));
            Ok(())
        });
        let services = Arc::new(Services::new(
            store.clone(),
            Arc::new(StubSource { failing }),
        ));
        (
            Dispatcher::new(services, Arc::new(notifier)),
            store,
            sent,
        )
    }

    fn query(data: &str) -> CallbackQuery {
        CallbackQuery {
            id: "q1".to_string(),
            from: User {
                id: 7,
                first_name: "Dana".to_string(),
                last_name: None,
                username: None,
            },
            message: Some(Message {
                message_id: 1,
                chat: Chat { id: 7 },
                from: None,
                text: None,
            }),
            data: Some(data.to_string()),
        }
    }

    fn text_message(text: &str) -> Message {
        Message {
            message_id: 2,
            chat: Chat { id: 7 },
            from: None,
            text: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_fight_callback_subscribes() {
        let (dispatcher, store, sent) = dispatcher(false);

        dispatcher.handle_callback(&query("600|401|A vs B")).await;

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 7);
        assert_eq!(sent[0].1.text, "✅ Subscribed to the fight: *A vs B*");
        assert_eq!(
            store.list_recipients("status/600/401").await.unwrap(),
            vec![7]
        );
        let due = store
            .list_due(Utc.with_ymd_and_hms(2030, 1, 2, 3, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_callback_is_ignored() {
        let (dispatcher, store, sent) = dispatcher(false);

        dispatcher.handle_callback(&query("1|2")).await;
        dispatcher.handle_callback(&query("remove|")).await;

        assert!(sent.lock().unwrap().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_source_failure_sends_generic_reply() {
        let (dispatcher, store, sent) = dispatcher(true);

        dispatcher.handle_callback(&query("600|401|A vs B")).await;

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.text.starts_with("❌ Failed to subscribe"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_callback_unsubscribes() {
        let (dispatcher, store, sent) = dispatcher(false);
        dispatcher.handle_callback(&query("600|401|A vs B")).await;

        dispatcher.handle_callback(&query("remove|A vs B")).await;

        let sent = sent.lock().unwrap();
        assert_eq!(sent[1].1.text, "✅ Subscription removed successfully!");
        assert!(
            store
                .list_recipients("status/600/401")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_messages() {
        let (dispatcher, _, sent) = dispatcher(false);

        dispatcher.handle_message(&text_message("/start")).await;
        dispatcher.handle_message(&text_message("/bogus")).await;
        dispatcher.handle_message(&text_message("hello")).await;
        dispatcher.handle_callback(&query("action_view")).await;

        let sent = sent.lock().unwrap();
        let texts: Vec<&str> = sent.iter().map(|(_, m)| m.text.as_str()).collect();
        assert_eq!(
            texts,
            [
                "Welcome! What would you like to do?",
                "❌ Unknown command. Try /start",
                "🤖 I don't understand that. Use /start or see actions from the main menu.",
                "You have no active subscriptions.",
            ]
        );
    }
}
