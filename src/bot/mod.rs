//! Telegram front end: long-polls for updates and hands them to the [`Dispatcher`].

pub mod callback;
pub mod dispatcher;
pub mod error;
pub mod telegram;
pub mod views;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::bot::dispatcher::Dispatcher;
use crate::bot::telegram::LONG_POLL_TIMEOUT_SECS;
use crate::bot::telegram::TelegramClient;
use crate::bot::telegram::Update;

/// Pause after a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct Bot {
    client: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    running: AtomicBool,
}

impl Bot {
    pub fn new(client: Arc<TelegramClient>, dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        info!("Initializing bot...");
        Arc::new(Self {
            client,
            dispatcher,
            running: AtomicBool::new(false),
        })
    }

    /// Starts the update loop. Calling it again while running does nothing.
    pub fn start(self: Arc<Self>) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        info!("Starting bot update loop...");

        tokio::spawn(async move {
            match self.client.get_me().await {
                Ok(me) => info!("Bot connected to Telegram as {}.", me.display_name()),
                Err(e) => warn!("Failed to identify bot account: {e}"),
            }
            self.poll_updates().await;
        });
    }

    /// Stops the update loop once the current long poll returns.
    pub fn stop(&self) {
        info!("Stopping bot update loop.");
        self.running.store(false, Ordering::SeqCst);
    }

    async fn poll_updates(self: Arc<Self>) {
        let mut offset: Option<i64> = None;

        while self.running.load(Ordering::SeqCst) {
            let updates = match self
                .client
                .get_updates(offset, LONG_POLL_TIMEOUT_SECS)
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    error!("Failed to fetch updates: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = Some(offset.map_or(update.update_id + 1, |o| {
                    o.max(update.update_id + 1)
                }));
                self.spawn_handler(update);
            }
        }
        info!("Bot update loop stopped.");
    }

    fn spawn_handler(&self, update: Update) {
        let client = self.client.clone();
        let dispatcher = self.dispatcher.clone();

        tokio::spawn(async move {
            debug!("Handling update {}.", update.update_id);
            if let Some(query) = &update.callback_query {
                // Clears the button's loading state.
                if let Err(e) = client.answer_callback_query(&query.id).await {
                    warn!("Failed to answer callback {}: {e}", query.id);
                }
            }
            dispatcher.handle_update(&update).await;
        });
    }
}
