//! Redis pub/sub relay for live notification events
//!
//! When enabled, every instance publishes its live events to one Redis
//! channel and feeds what it receives from that channel into its local hub,
//! so SSE subscribers see events raised on any instance.

use redis::{AsyncCommands, Client};
use tokio_stream::StreamExt;

use crate::{
    error::{AppError, AppResult},
    models::notification::LiveEvent,
    services::notifications::NotificationHub,
};

#[derive(Clone)]
pub struct RedisRelay {
    client: Client,
    channel: String,
}

impl RedisRelay {
    /// Create a new relay and check the connection
    pub async fn new(url: &str, channel: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self {
            client,
            channel: channel.to_string(),
        })
    }

    /// Publish one event to the shared channel
    pub async fn publish(&self, event: &LiveEvent) -> AppResult<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::Internal(format!("Failed to encode live event: {}", e)))?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))?;

        conn.publish::<_, _, ()>(&self.channel, payload)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to publish live event: {}", e)))?;

        Ok(())
    }

    /// Forward events from the shared channel into the local hub until the
    /// subscription ends
    pub async fn run(self, hub: NotificationHub) -> AppResult<()> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to open Redis subscription: {}", e)))?;

        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to subscribe to {}: {}", self.channel, e)))?;

        tracing::info!(channel = %self.channel, "Relaying live notifications through Redis");

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unreadable Redis message");
                    continue;
                }
            };

            match serde_json::from_str::<LiveEvent>(&payload) {
                Ok(event) => {
                    hub.publish(event);
                }
                Err(e) => tracing::warn!(error = %e, "Dropping malformed live event"),
            }
        }

        tracing::warn!(channel = %self.channel, "Redis subscription closed");
        Ok(())
    }
}
