use lapin::options::{
    BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use sha2::{Digest, Sha256};

use crate::error::BotError;

const PERSISTENT_DELIVERY: u8 = 2;

pub fn queue_name(queue_id: u32) -> String {
    format!("update_queue_{queue_id}")
}

/// Deterministic shard routing: SHA-256 over the ASCII decimal chat id,
/// taken as a big-endian integer mod the queue count.
pub fn shard_for_chat(chat_id: i64, number_queues: u32) -> u32 {
    let digest = Sha256::digest(chat_id.to_string().as_bytes());
    let n = u64::from(number_queues);
    let residue = digest
        .iter()
        .fold(0u64, |acc, byte| ((acc << 8) | u64::from(*byte)) % n);
    residue as u32
}

/// One AMQP connection and channel per process.
pub struct Broker {
    connection: Connection,
    pub channel: Channel,
}

impl Broker {
    pub async fn connect(url: &str) -> Result<Broker, BotError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        tracing::info!("connected to broker");
        Ok(Broker {
            connection,
            channel,
        })
    }

    pub async fn declare_queue(&self, name: &str) -> Result<(), BotError> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    pub async fn set_prefetch(&self, count: u16) -> Result<(), BotError> {
        self.channel
            .basic_qos(count, BasicQosOptions::default())
            .await?;
        Ok(())
    }

    /// Persistent publish with the routing headers; resolves once the broker
    /// confirms the message.
    pub async fn publish_update(
        &self,
        queue: &str,
        chat_id: i64,
        payload: &[u8],
    ) -> Result<(), BotError> {
        let mut headers = FieldTable::default();
        headers.insert(
            "message_type".into(),
            AMQPValue::LongString("telegram_update".into()),
        );
        headers.insert("chat_id".into(), AMQPValue::LongLongInt(chat_id));

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT_DELIVERY)
            .with_headers(headers);

        self.channel
            .basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
            .await?
            .await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), BotError> {
        self.connection.close(0, "shutdown").await?;
        tracing::info!("broker connection closed");
        Ok(())
    }
}
