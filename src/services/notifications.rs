//! Notification delivery: persisted feed plus live push channel

use tokio::sync::broadcast;

use crate::{
    error::AppResult,
    models::{
        enums::Role,
        notification::{LiveEvent, LivePayload, NewNotification, Notification},
    },
    repository::Repository,
    services::redis::RedisRelay,
};

/// In-process fan-out of live events. Subscribers that fall behind lose
/// the oldest events; nothing is retried.
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<LiveEvent>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send to every current subscriber; returns how many received it
    pub fn publish(&self, event: LiveEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }
}

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
    hub: NotificationHub,
    relay: Option<RedisRelay>,
}

impl NotificationsService {
    pub fn new(repository: Repository, hub: NotificationHub, relay: Option<RedisRelay>) -> Self {
        Self { repository, hub, relay }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.hub.subscribe()
    }

    /// Push one live event. With a relay the event reaches the local hub
    /// through Redis, otherwise it is published locally.
    async fn push(&self, user_id: i32, payload: LivePayload) {
        let event = LiveEvent { user_id, payload };

        if let Some(relay) = &self.relay {
            match relay.publish(&event).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Redis publish failed, delivering locally");
                }
            }
        }

        let receivers = self.hub.publish(event);
        tracing::trace!(user_id, receivers, "Published live event");
    }

    async fn push_unread_count(&self, user_id: i32) {
        match self.repository.notifications.unread_count(user_id).await {
            Ok(count) => self.push(user_id, LivePayload::UnreadCount { count }).await,
            Err(e) => tracing::warn!(user_id, error = %e, "Failed to count unread notifications"),
        }
    }

    /// Persist a notification and push `new_notification` and `unread_count`
    pub async fn notify(&self, notification: NewNotification) -> AppResult<Notification> {
        let created = self.repository.notifications.create(&notification).await?;
        tracing::debug!(
            notification_id = created.id,
            recipient_id = created.recipient_id,
            priority = %created.priority,
            "Notification created"
        );

        self.push(created.recipient_id, LivePayload::NewNotification(created.clone()))
            .await;
        self.push_unread_count(created.recipient_id).await;
        Ok(created)
    }

    /// Deliver a batch; failures are logged and never reach the caller
    pub async fn notify_all(&self, notifications: Vec<NewNotification>) {
        for notification in notifications {
            let recipient_id = notification.recipient_id;
            if let Err(e) = self.notify(notification).await {
                tracing::warn!(recipient_id, error = %e, "Failed to deliver notification");
            }
        }
    }

    /// Send the same message to every active user holding one of `roles`,
    /// except `skip_user`
    pub async fn notify_roles(
        &self,
        roles: &[Role],
        skip_user: Option<i32>,
        build: impl Fn(i32) -> NewNotification,
    ) {
        let recipients = match self.repository.users.active_ids_with_roles(roles).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve notification recipients");
                return;
            }
        };

        let batch = recipients
            .into_iter()
            .filter(|id| Some(*id) != skip_user)
            .map(build)
            .collect();
        self.notify_all(batch).await;
    }

    pub async fn list(
        &self,
        recipient_id: i32,
        unread_only: bool,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<Notification>, i64)> {
        self.repository
            .notifications
            .list(recipient_id, unread_only, page, per_page)
            .await
    }

    pub async fn unread_count(&self, recipient_id: i32) -> AppResult<i64> {
        self.repository.notifications.unread_count(recipient_id).await
    }

    pub async fn mark_read(&self, id: i32, recipient_id: i32, read: bool) -> AppResult<Notification> {
        let notification = self.repository.notifications.mark_read(id, recipient_id, read).await?;
        self.push_unread_count(recipient_id).await;
        Ok(notification)
    }

    pub async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64> {
        let updated = self.repository.notifications.mark_all_read(recipient_id).await?;
        if updated > 0 {
            self.push_unread_count(recipient_id).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: i32, recipient_id: i32) -> AppResult<()> {
        self.repository.notifications.delete(id, recipient_id).await?;
        self.push_unread_count(recipient_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_delivers_to_all_subscribers() {
        let hub = NotificationHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let delivered = hub.publish(LiveEvent {
            user_id: 3,
            payload: LivePayload::UnreadCount { count: 1 },
        });
        assert_eq!(delivered, 2);

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.user_id, 3);
            assert_eq!(event.payload, LivePayload::UnreadCount { count: 1 });
        }
    }

    #[tokio::test]
    async fn test_hub_without_subscribers_drops_silently() {
        let hub = NotificationHub::new(4);
        let delivered = hub.publish(LiveEvent {
            user_id: 1,
            payload: LivePayload::UnreadCount { count: 0 },
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_loses_oldest_events() {
        let hub = NotificationHub::new(2);
        let mut rx = hub.subscribe();

        for count in 0..4 {
            hub.publish(LiveEvent {
                user_id: 1,
                payload: LivePayload::UnreadCount { count },
            });
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload, LivePayload::UnreadCount { count: 2 });
    }
}
