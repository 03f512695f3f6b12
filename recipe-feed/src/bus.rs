//! Bus producer and consumer over Redis streams.
//!
//! One topic, entries keyed by author, consumer groups for the read side.
//! `XACK` is issued by the caller only after the downstream call returns,
//! which gives at-least-once processing; duplicates die at the store.

use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, instrument};

use crate::{FeedError, FeedEvent};

const KEY_FIELD: &str = "key";
const PAYLOAD_FIELD: &str = "payload";

/// Publishes feed events onto the topic.
pub struct BusProducer {
    conn: MultiplexedConnection,
    topic: String,
}

impl BusProducer {
    pub async fn connect(url: &str, topic: &str) -> Result<Self, FeedError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(topic, "bus producer connected");
        Ok(BusProducer {
            conn,
            topic: topic.to_string(),
        })
    }

    /// Publish one event; the message key is the author. Returns the bus
    /// entry id. Delivery is at-least-once; callers never need to dedup
    /// here.
    #[instrument(name = "bus_publish", skip_all, fields(author = %event.author))]
    pub async fn publish(&mut self, event: &FeedEvent) -> Result<String, FeedError> {
        let payload = serde_json::to_string(event)?;
        let id: String = self
            .conn
            .xadd(
                &self.topic,
                "*",
                &[(KEY_FIELD, event.author.as_str()), (PAYLOAD_FIELD, &payload)],
            )
            .await?;
        debug!(entry = %id, "published event");
        Ok(id)
    }
}

/// One delivered message: bus entry id, partition key, decoded event.
#[derive(Clone, Debug, PartialEq)]
pub struct BusMessage {
    pub id: String,
    pub key: String,
    pub event: FeedEvent,
}

/// Group consumer over the topic.
pub struct BusConsumer {
    conn: MultiplexedConnection,
    topic: String,
    group: String,
    consumer: String,
}

impl BusConsumer {
    /// Connect and ensure the consumer group exists (`MKSTREAM`); an
    /// already-existing group is fine.
    pub async fn connect(
        url: &str,
        topic: &str,
        group: &str,
        consumer: &str,
    ) -> Result<Self, FeedError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let created: Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(topic, group, "0")
            .await;
        if let Err(err) = created {
            // BUSYGROUP means someone else created it first.
            if !err.to_string().contains("BUSYGROUP") {
                return Err(err.into());
            }
        }
        info!(topic, group, consumer, "bus consumer connected");
        Ok(BusConsumer {
            conn,
            topic: topic.to_string(),
            group: group.to_string(),
            consumer: consumer.to_string(),
        })
    }

    /// Read up to `max_messages` new entries for this group. Undecodable
    /// payloads are surfaced with their id so the caller can ack them away
    /// instead of poisoning the group.
    #[instrument(name = "bus_poll", skip_all, fields(max_messages))]
    pub async fn poll(
        &mut self,
        max_messages: usize,
    ) -> Result<(Vec<BusMessage>, Vec<String>), FeedError> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(max_messages)
            .block(1000);
        let reply: StreamReadReply = self
            .conn
            .xread_options(&[&self.topic], &[">"], &options)
            .await?;

        let mut messages = Vec::new();
        let mut poisoned = Vec::new();
        for stream in reply.keys {
            for entry in stream.ids {
                let key: String = entry.get(KEY_FIELD).unwrap_or_default();
                let payload: String = entry.get(PAYLOAD_FIELD).unwrap_or_default();
                match serde_json::from_str::<FeedEvent>(&payload) {
                    Ok(event) => messages.push(BusMessage {
                        id: entry.id.clone(),
                        key,
                        event,
                    }),
                    Err(_) => poisoned.push(entry.id.clone()),
                }
            }
        }
        debug!(delivered = messages.len(), poisoned = poisoned.len(), "polled topic");
        Ok((messages, poisoned))
    }

    /// Acknowledge processed entries. Call only after the downstream work
    /// for them has durably completed.
    pub async fn ack(&mut self, ids: &[String]) -> Result<(), FeedError> {
        if ids.is_empty() {
            return Ok(());
        }
        let _: i64 = self.conn.xack(&self.topic, &self.group, ids).await?;
        Ok(())
    }
}
