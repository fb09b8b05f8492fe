use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;
use walkout_bot::clock::Clock;
use walkout_bot::entity::RecipientId;
use walkout_bot::notifier::Notifier;
use walkout_bot::notifier::NotifyError;
use walkout_bot::notifier::OutgoingMessage;
use walkout_bot::repository::Repository;
use walkout_bot::source::Event;
use walkout_bot::source::FightStatus;
use walkout_bot::source::StatusSource;
use walkout_bot::source::error::SourceError;

pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("walkout-bot-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let repo = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    (Arc::new(repo), db_path)
}

pub async fn teardown_db(repo: Arc<Repository>, db_path: PathBuf) {
    repo.close().await;
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}

// MOCK SOURCE

/// Status source driven entirely by test-provided state.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockSource {
    pub state: Arc<RwLock<MockSourceState>>,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MockSourceState {
    pub events: HashMap<String, Event>,
    pub current_event: Option<String>,
    /// Status type name per status locator.
    pub statuses: HashMap<String, String>,
    /// Fighter name per athlete locator.
    pub fighters: HashMap<String, String>,
    /// Delay before a fighter lookup returns, per athlete locator.
    pub fighter_delays: HashMap<String, Duration>,
    /// Locators whose lookups fail.
    pub failing: HashSet<String>,
    /// Every locator passed to `resolve_fighter_name`.
    pub fighter_lookups: Vec<String>,
    /// Every locator passed to `resolve_fight_status`.
    pub status_lookups: Vec<String>,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_event(&self, event: Event) {
        let mut state = self.state.write().unwrap();
        state.current_event = Some(event.id.clone());
        state.events.insert(event.id.clone(), event);
    }

    pub fn set_status(&self, locator: &str, type_name: &str) {
        self.state
            .write()
            .unwrap()
            .statuses
            .insert(locator.to_string(), type_name.to_string());
    }

    pub fn set_fighter(&self, locator: &str, name: &str, delay: Duration) {
        let mut state = self.state.write().unwrap();
        state
            .fighters
            .insert(locator.to_string(), name.to_string());
        state
            .fighter_delays
            .insert(locator.to_string(), delay);
    }

    pub fn fail(&self, locator: &str) {
        self.state
            .write()
            .unwrap()
            .failing
            .insert(locator.to_string());
    }

    pub fn recover(&self, locator: &str) {
        self.state.write().unwrap().failing.remove(locator);
    }

    pub fn fighter_lookups(&self) -> Vec<String> {
        self.state.read().unwrap().fighter_lookups.clone()
    }

    pub fn status_lookups(&self) -> Vec<String> {
        self.state.read().unwrap().status_lookups.clone()
    }

    fn unavailable(locator: &str) -> SourceError {
        SourceError::HttpStatus {
            url: locator.to_string(),
            status: 503,
        }
    }
}

#[async_trait]
impl StatusSource for MockSource {
    async fn resolve_current_event(&self) -> Result<Event, SourceError> {
        let state = self.state.read().unwrap();
        state
            .current_event
            .as_ref()
            .and_then(|id| state.events.get(id))
            .cloned()
            .ok_or(SourceError::NoEvents)
    }

    async fn resolve_event(&self, event_id: &str) -> Result<Event, SourceError> {
        let state = self.state.read().unwrap();
        if state.failing.contains(event_id) {
            return Err(Self::unavailable(event_id));
        }
        state
            .events
            .get(event_id)
            .cloned()
            .ok_or(SourceError::NoEvents)
    }

    async fn resolve_fighter_name(&self, locator: &str) -> Result<String, SourceError> {
        let delay = {
            let mut state = self.state.write().unwrap();
            state.fighter_lookups.push(locator.to_string());
            state.fighter_delays.get(locator).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.read().unwrap();
        if state.failing.contains(locator) {
            return Err(Self::unavailable(locator));
        }
        state
            .fighters
            .get(locator)
            .cloned()
            .ok_or_else(|| Self::unavailable(locator))
    }

    async fn resolve_fight_status(&self, locator: &str) -> Result<FightStatus, SourceError> {
        let mut state = self.state.write().unwrap();
        state.status_lookups.push(locator.to_string());
        if state.failing.contains(locator) {
            return Err(Self::unavailable(locator));
        }
        state
            .statuses
            .get(locator)
            .map(FightStatus::from_type_name)
            .ok_or_else(|| Self::unavailable(locator))
    }

    fn status_locator(&self, event_id: &str, fight_id: &str) -> String {
        format!("mock://events/{event_id}/competitions/{fight_id}/status")
    }
}

// RECORDING NOTIFIER

/// Notifier that records every message and can be told to reject recipients.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(RecipientId, OutgoingMessage)>>>,
    pub rejecting: Arc<Mutex<HashSet<RecipientId>>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, recipient: RecipientId) {
        self.rejecting.lock().unwrap().insert(recipient);
    }

    pub fn sent(&self) -> Vec<(RecipientId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: RecipientId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(r, _)| *r == recipient)
            .map(|(_, m)| m.text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: RecipientId,
        message: OutgoingMessage,
    ) -> Result<(), NotifyError> {
        if self.rejecting.lock().unwrap().contains(&recipient) {
            return Err(NotifyError::Rejected {
                recipient,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((recipient, message));
        Ok(())
    }
}

// FIXED CLOCK

#[derive(Clone)]
#[allow(dead_code)]
pub struct FixedClock {
    pub now: Arc<Mutex<DateTime<Utc>>>,
}

#[allow(dead_code)]
impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
