//! Background task that notifies recipients when fighters walk out.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use log::warn;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::entity::DueSubscription;
use crate::entity::RecipientId;
use crate::notifier::Notifier;
use crate::notifier::OutgoingMessage;
use crate::repository::SubscriptionStore;
use crate::repository::error::StoreError;
use crate::source::StatusKind;
use crate::source::StatusSource;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// What one poll cycle did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub due: usize,
    /// Keys whose recipients were notified and which were removed.
    pub notified_keys: Vec<String>,
    /// Messages delivered successfully.
    pub deliveries: usize,
    /// Keys removed because the fight ended without a walk-out being seen.
    pub finished_keys: Vec<String>,
    /// Keys skipped this cycle because their status could not be fetched.
    pub failed_keys: Vec<String>,
}

/// Periodically reconciles due subscriptions against the status source.
pub struct WalkoutPoller {
    store: Arc<dyn SubscriptionStore>,
    source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    running: AtomicBool,
    /// Bumped on every start. A loop exits once it no longer owns the current value.
    generation: AtomicU64,
}

impl WalkoutPoller {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        info!(
            "Initializing WalkoutPoller with poll interval {:?}",
            poll_interval
        );
        Arc::new(Self {
            store,
            source,
            notifier,
            clock,
            poll_interval,
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        })
    }

    /// Starts the polling loop. Calling it again while running does nothing.
    pub fn start(self: Arc<Self>) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            info!("Starting WalkoutPoller check loop {generation}.");
            self.spawn_check_loop(generation);
        }
    }

    /// Stops the polling loop at its next tick.
    pub fn stop(&self) {
        info!("Stopping WalkoutPoller check loop.");
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn spawn_check_loop(self: Arc<Self>, generation: u64) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                if !self.running.load(Ordering::SeqCst)
                    || self.generation.load(Ordering::SeqCst) != generation
                {
                    info!("Stopping check loop {generation}.");
                    break;
                }
                if let Err(e) = self.run_cycle().await {
                    error!("Error checking due subscriptions: {}", e);
                }
            }
        });
    }

    /// Runs one reconciliation cycle.
    ///
    /// Fails only when the due set itself cannot be read. Failures of a
    /// single key are logged and that key is retried next cycle.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        match self.store.prune_orphans().await {
            Ok(0) => {}
            Ok(pruned) => info!("Pruned {pruned} subscriptions without recipients."),
            Err(e) => warn!("Failed to prune orphaned subscriptions: {e}"),
        }

        let due = self.store.list_due(self.clock.now()).await?;
        let mut report = CycleReport {
            due: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            debug!("No due subscriptions.");
            return Ok(report);
        }
        info!("Found {} due subscriptions to check.", due.len());

        for sub in due {
            self.check_subscription(sub, &mut report).await;
        }

        debug!("Finished checking due subscriptions: {report:?}");
        Ok(report)
    }

    async fn check_subscription(&self, sub: DueSubscription, report: &mut CycleReport) {
        let status = match self.source.resolve_fight_status(&sub.key).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Status fetch failed for {} ({}): {e}", sub.label, sub.key);
                report.failed_keys.push(sub.key);
                return;
            }
        };
        debug!("{} is {}.", sub.label, status.type_name);

        match status.kind {
            StatusKind::WalkingOut => {
                let recipients = match self.store.take_recipients(&sub.key).await {
                    Ok(recipients) => recipients,
                    Err(e) => {
                        error!("Failed to take recipients for {}: {e}", sub.key);
                        report.failed_keys.push(sub.key);
                        return;
                    }
                };
                info!(
                    "Fighters walking out for {}. Notifying {} recipient(s).",
                    sub.label,
                    recipients.len()
                );
                report.deliveries += self.notify_all(&sub, &recipients).await;
                report.notified_keys.push(sub.key);
            }
            StatusKind::Final => {
                match self.store.remove_subscription(&sub.key).await {
                    Ok(()) => {
                        info!("{} is already over. Removed subscription.", sub.label);
                        report.finished_keys.push(sub.key);
                    }
                    Err(e) => {
                        error!("Failed to remove finished subscription {}: {e}", sub.key);
                        report.failed_keys.push(sub.key);
                    }
                }
            }
            _ => {}
        }
    }

    /// Sends the walk-out message to every recipient. Returns the number delivered.
    async fn notify_all(&self, sub: &DueSubscription, recipients: &[RecipientId]) -> usize {
        let text = walkout_message(&sub.label);
        let mut delivered = 0;
        for &recipient in recipients {
            match self
                .notifier
                .send(recipient, OutgoingMessage::text(text.clone()))
                .await
            {
                Ok(()) => delivered += 1,
                Err(e) => error!("Failed to notify {recipient} about {}: {e}", sub.label),
            }
        }
        delivered
    }
}

pub fn walkout_message(label: &str) -> String {
    format!("🚨 The Fight is about to start: {label}")
}
