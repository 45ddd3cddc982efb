use std::sync::Arc;

use wordwheel::broker::Broker;
use wordwheel::config::{self, Config};
use wordwheel::metrics::Metrics;
use wordwheel::services::registry::FsmRegistry;
use wordwheel::telegram::client::TgClient;
use wordwheel::worker::Worker;
use wordwheel::{Store, db};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordwheel=debug".into()),
        )
        .init();

    let Some(queue_id) = parse_queue_id(std::env::args()) else {
        eprintln!("usage: worker --queue-id=<int>");
        std::process::exit(2);
    };

    let config = match Config::load(&config::config_path()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    if queue_id >= config.broker.number_queues {
        tracing::error!(
            queue_id,
            number_queues = config.broker.number_queues,
            "queue id out of range",
        );
        std::process::exit(2);
    }

    let pool = db::create_pool(&config.database.url())
        .await
        .expect("Failed to create database pool");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let broker = Broker::connect(&config.broker.url())
        .await
        .expect("Failed to connect to broker");

    let metrics = Metrics::new().expect("Failed to build metrics");
    let metrics_port = config.metrics.port;
    tokio::spawn({
        let metrics = metrics.clone();
        async move {
            if let Err(e) = metrics.serve(metrics_port).await {
                tracing::error!("metrics server failed: {e}");
            }
        }
    });

    let store = Store {
        db: pool,
        tg: TgClient::new(&config.bot.token),
        config: Arc::new(config),
        registry: FsmRegistry::new(),
        metrics,
    };

    let worker = Worker::new(store, queue_id);
    let shutdown = async {
        tokio::signal::ctrl_c().await.expect("Failed to listen for ctrl-c");
        tracing::info!("shutdown signal received");
    };
    if let Err(e) = worker.run(&broker, shutdown).await {
        tracing::error!("worker failed: {e}");
        std::process::exit(1);
    }
    if let Err(e) = broker.close().await {
        tracing::warn!("broker close failed: {e}");
    }
}

fn parse_queue_id(args: impl Iterator<Item = String>) -> Option<u32> {
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--queue-id=") {
            return value.parse().ok();
        }
        if arg == "--queue-id" {
            return args.next()?.parse().ok();
        }
    }
    None
}
