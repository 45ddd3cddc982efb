use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use wordwheel::broker::Broker;
use wordwheel::config::{self, Config};
use wordwheel::poller::Poller;
use wordwheel::telegram::client::TgClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordwheel=debug".into()),
        )
        .init();

    let config = match Config::load(&config::config_path()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let tg = TgClient::new(&config.bot.token);
    let broker = Broker::connect(&config.broker.url())
        .await
        .expect("Failed to connect to broker");

    let stop = Arc::new(AtomicBool::new(false));
    tokio::spawn({
        let stop = stop.clone();
        async move {
            tokio::signal::ctrl_c().await.expect("Failed to listen for ctrl-c");
            tracing::info!("shutdown signal received");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let mut poller = Poller::new(tg, broker, config.broker.number_queues);
    if let Err(e) = poller.run(stop).await {
        tracing::error!("poller failed: {e}");
        std::process::exit(1);
    }
    if let Err(e) = poller.close().await {
        tracing::warn!("broker close failed: {e}");
    }
}
