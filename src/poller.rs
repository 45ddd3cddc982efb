use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;

use crate::broker::{self, Broker};
use crate::error::BotError;
use crate::telegram::client::TgClient;
use crate::telegram::types::{self, Update};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);
const PUBLISH_ATTEMPTS: u32 = 3;
const PUBLISH_BACKOFF: Duration = Duration::from_millis(500);

/// Single long-poll loop: fetch updates, normalize, publish each to its
/// chat's shard queue, and only then advance the offset. A failed publish
/// leaves the offset in place, so the same updates are fetched again after
/// the backoff instead of being dropped.
pub struct Poller {
    tg: TgClient,
    broker: Broker,
    number_queues: u32,
    timeout: u64,
    offset: Option<i64>,
}

impl Poller {
    pub fn new(tg: TgClient, broker: Broker, number_queues: u32) -> Self {
        Poller {
            tg,
            broker,
            number_queues,
            timeout: 30,
            offset: None,
        }
    }

    /// Poll until `stop` is raised. The flag is checked at iteration
    /// boundaries, so an in-flight long poll completes before exit.
    pub async fn run(&mut self, stop: Arc<AtomicBool>) -> Result<(), BotError> {
        for queue_id in 0..self.number_queues {
            self.broker.declare_queue(&broker::queue_name(queue_id)).await?;
        }
        tracing::info!(queues = self.number_queues, "polling started");

        while !stop.load(Ordering::SeqCst) {
            if let Err(e) = self.poll_once().await {
                tracing::error!("poll iteration failed: {e}");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
        tracing::info!("poller stopped");
        Ok(())
    }

    pub async fn close(self) -> Result<(), BotError> {
        self.broker.close().await
    }

    async fn poll_once(&mut self) -> Result<(), BotError> {
        let raw_updates = self.tg.get_updates(self.offset, self.timeout).await?;
        for raw in &raw_updates {
            let Some(update_id) = raw.get("update_id").and_then(Value::as_i64) else {
                tracing::error!("update without update_id skipped");
                continue;
            };
            match types::parse_update(raw) {
                Some(update) => self.publish(&update).await?,
                // Malformed updates are skipped but still advance the
                // offset, so one bad payload cannot stall the stream.
                None => tracing::error!(update_id, "malformed update skipped"),
            }
            self.offset = Some(update_id + 1);
        }
        Ok(())
    }

    async fn publish(&self, update: &Update) -> Result<(), BotError> {
        let chat_id = update.body.chat_id();
        let queue = broker::queue_name(broker::shard_for_chat(chat_id, self.number_queues));
        let payload = serde_json::to_vec(update)?;

        let mut attempt = 1;
        loop {
            match self.broker.publish_update(&queue, chat_id, &payload).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < PUBLISH_ATTEMPTS => {
                    tracing::warn!(
                        update_id = update.update_id,
                        queue = %queue,
                        attempt,
                        "publish failed, retrying: {e}",
                    );
                    tokio::time::sleep(PUBLISH_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
