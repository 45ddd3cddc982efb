use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions};
use lapin::types::FieldTable;

use crate::Store;
use crate::broker::{self, Broker};
use crate::error::BotError;
use crate::handlers;
use crate::telegram::types::Update;

/// Consumer of one shard queue. With `prefetch=1` and one worker per queue,
/// updates for a chat are handled strictly in order; the ack goes out only
/// after the handler returns, so an update interrupted by a crash is
/// redelivered.
pub struct Worker {
    store: Store,
    queue_id: u32,
}

impl Worker {
    pub fn new(store: Store, queue_id: u32) -> Self {
        Worker { store, queue_id }
    }

    pub async fn run(
        &self,
        broker: &Broker,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BotError> {
        let queue = broker::queue_name(self.queue_id);
        broker.declare_queue(&queue).await?;
        broker.set_prefetch(self.store.config.broker.prefetch_count).await?;

        let mut consumer = broker
            .channel
            .basic_consume(
                &queue,
                &format!("worker_{}", self.queue_id),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        tracing::info!(queue = %queue, "worker started");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(queue = %queue, "worker stopped");
                    return Ok(());
                }
                delivery = consumer.next() => {
                    match delivery {
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await?,
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::warn!(queue = %queue, "consumer stream closed");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn handle_delivery(&self, delivery: Delivery) -> Result<(), BotError> {
        let update: Update = match serde_json::from_slice(&delivery.data) {
            Ok(update) => update,
            Err(e) => {
                // A payload that cannot decode will never succeed; drop it
                // rather than wedge the shard behind it.
                tracing::error!("dropping undecodable message: {e}");
                delivery.ack(BasicAckOptions::default()).await?;
                return Ok(());
            }
        };

        match handlers::dispatch(&self.store, &update).await {
            Ok(()) => delivery.ack(BasicAckOptions::default()).await?,
            Err(e) => {
                tracing::error!(update_id = update.update_id, "handler failed: {e}");
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..BasicNackOptions::default()
                    })
                    .await?;
            }
        }
        Ok(())
    }
}
