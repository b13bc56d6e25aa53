//! Notifications
//!
//! Fire-and-forget messages to users. Services collect messages in an
//! [`Outbox`] while their transaction runs and hand it to the
//! [`NotificationQueue`] only after commit; the [`NotificationDispatcher`]
//! worker delivers them to a [`NotificationSink`]. Delivery failures are
//! logged and dropped.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use shared::util::now_millis;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Messages kept per user in the inbox
const INBOX_CAPACITY: usize = 100;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: i64,
    pub message: String,
    pub created_at: i64,
}

/// Delivery endpoint for notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: i64, message: &str) -> Result<(), NotifyError>;
}

/// In-process inbox, read back over `GET /api/notifications`
#[derive(Debug, Default)]
pub struct InboxSink {
    inbox: DashMap<i64, Vec<Notification>>,
}

impl InboxSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first
    pub fn list(&self, user_id: i64) -> Vec<Notification> {
        self.inbox
            .get(&user_id)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self, user_id: i64) -> usize {
        self.inbox
            .remove(&user_id)
            .map(|(_, entries)| entries.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl NotificationSink for InboxSink {
    async fn notify(&self, user_id: i64, message: &str) -> Result<(), NotifyError> {
        let mut entries = self.inbox.entry(user_id).or_default();
        entries.push(Notification {
            id: Uuid::new_v4(),
            user_id,
            message: message.to_string(),
            created_at: now_millis(),
        });
        if entries.len() > INBOX_CAPACITY {
            let overflow = entries.len() - INBOX_CAPACITY;
            entries.drain(..overflow);
        }
        Ok(())
    }
}

/// Messages gathered during a transaction
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<(i64, String)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, user_id: i64, message: impl Into<String>) {
        self.messages.push((user_id, message.into()));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Sending half of the notification channel
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<(i64, String)>,
}

impl NotificationQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<(i64, String)>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue committed messages; never blocks, drops on overflow
    pub fn dispatch(&self, outbox: Outbox) {
        for (user_id, message) in outbox.messages {
            if let Err(e) = self.tx.try_send((user_id, message)) {
                tracing::warn!(user_id, error = %e, "Notification dropped");
            }
        }
    }
}

/// Background worker draining the queue into a sink
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<(i64, String)>,
    sink: Arc<dyn NotificationSink>,
    shutdown: CancellationToken,
}

impl NotificationDispatcher {
    pub fn new(
        rx: mpsc::Receiver<(i64, String)>,
        sink: Arc<dyn NotificationSink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { rx, sink, shutdown }
    }

    pub async fn run(mut self) {
        tracing::info!("Notification dispatcher started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Notification dispatcher received shutdown signal");
                    break;
                }
                next = self.rx.recv() => {
                    let Some((user_id, message)) = next else {
                        tracing::info!("Notification channel closed");
                        break;
                    };
                    if let Err(e) = self.sink.notify(user_id, &message).await {
                        tracing::warn!(user_id, error = %e, "Notification delivery failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatcher_delivers_to_inbox() {
        let (queue, rx) = NotificationQueue::channel(8);
        let sink = Arc::new(InboxSink::new());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            NotificationDispatcher::new(rx, sink.clone(), shutdown.clone()).run(),
        );

        let mut outbox = Outbox::new();
        outbox.push(7, "Tu carrito fue asignado");
        outbox.push(7, "Stock confirmado");
        queue.dispatch(outbox);
        drop(queue);
        handle.await.unwrap();

        let inbox = sink.list(7);
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].message, "Stock confirmado");
        assert!(sink.list(8).is_empty());
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (queue, mut rx) = NotificationQueue::channel(1);
        let mut outbox = Outbox::new();
        outbox.push(1, "a");
        outbox.push(1, "b");
        queue.dispatch(outbox);

        assert_eq!(rx.try_recv().unwrap(), (1, "a".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn inbox_is_bounded() {
        let sink = InboxSink::new();
        for i in 0..(INBOX_CAPACITY + 5) {
            sink.notify(1, &format!("m{i}")).await.unwrap();
        }
        let inbox = sink.list(1);
        assert_eq!(inbox.len(), INBOX_CAPACITY);
        assert_eq!(inbox[0].message, format!("m{}", INBOX_CAPACITY + 4));
        assert_eq!(sink.clear(1), INBOX_CAPACITY);
    }
}
