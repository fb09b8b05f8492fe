//! Application entry point for walkout-bot.
//!
//! Initializes all components, starts the Telegram bot and the walk-out
//! poller, and runs until Ctrl+C.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use log::debug;
use log::info;
use walkout_bot::bot::Bot;
use walkout_bot::bot::dispatcher::Dispatcher;
use walkout_bot::bot::telegram::TelegramClient;
use walkout_bot::clock::SystemClock;
use walkout_bot::config::Config;
use walkout_bot::config::StoreBackend;
use walkout_bot::logging::setup_logging;
use walkout_bot::repository::Repository;
use walkout_bot::repository::SubscriptionStore;
use walkout_bot::repository::memory::MemoryStore;
use walkout_bot::service::Services;
use walkout_bot::source::StatusSource;
use walkout_bot::source::espn_source::EspnSource;
use walkout_bot::task::walkout_poller::WalkoutPoller;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = load_config()?;

    let store = setup_store(&config, init_start).await?;
    let source: Arc<dyn StatusSource> =
        Arc::new(EspnSource::new(&config.espn_api_url, config.http_timeout)?);
    let services = Arc::new(Services::new(store.clone(), source.clone()));
    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.telegram_token,
    )?);

    let bot = setup_bot(services, telegram.clone(), init_start);
    let poller = setup_poller(&config, store, source, telegram, init_start);

    run(init_start).await?;

    poller.stop();
    bot.stop();
    Ok(())
}

fn load_config() -> Result<Config> {
    debug!("Loading configuration...");
    let config = Config::new()?;
    setup_logging(&config)?;
    info!("Starting walkout-bot...");
    Ok(config)
}

async fn setup_store(config: &Config, init_start: Instant) -> Result<Arc<dyn SubscriptionStore>> {
    let store: Arc<dyn SubscriptionStore> = match config.store_backend {
        StoreBackend::Sqlite => {
            debug!("Setting up Repository...");
            let repo = Repository::new(&config.db_url, &config.db_path).await?;

            info!("Running database migrations...");
            repo.run_migrations().await?;
            Arc::new(repo)
        }
        StoreBackend::Memory => {
            info!("Using in-memory subscription store. Subscriptions will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    };
    info!(
        "Store setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
    Ok(store)
}

fn setup_bot(
    services: Arc<Services>,
    telegram: Arc<TelegramClient>,
    init_start: Instant,
) -> Arc<Bot> {
    info!("Starting bot...");
    let dispatcher = Arc::new(Dispatcher::new(services, telegram.clone()));
    let bot = Bot::new(telegram, dispatcher);
    bot.clone().start();
    info!(
        "Bot setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
    bot
}

fn setup_poller(
    config: &Config,
    store: Arc<dyn SubscriptionStore>,
    source: Arc<dyn StatusSource>,
    telegram: Arc<TelegramClient>,
    init_start: Instant,
) -> Arc<WalkoutPoller> {
    debug!("Setting up WalkoutPoller...");
    let poller = WalkoutPoller::new(
        store,
        source,
        telegram,
        Arc::new(SystemClock),
        config.poll_interval,
    );
    poller.clone().start();
    info!(
        "Poller setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
    poller
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "walkout-bot is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}
