//! # Notification Dispatcher
//!
//! Handlers hand notifications to a [`Notifier`] and move on; a background
//! task drains the queue and persists each one. A failed insert is logged and
//! never fails the request that triggered it.

use medportal_core::models::notification::NewNotification;
use medportal_db::{repositories::notification, DbPool};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct Notifier {
    sender: UnboundedSender<NewNotification>,
}

impl Notifier {
    /// Creates a notifier whose queue is drained into the `notifications`
    /// table by a task spawned on the current runtime.
    pub fn spawn(pool: DbPool) -> Self {
        let (notifier, receiver) = Self::channel();
        tokio::spawn(persist_notifications(pool, receiver));
        notifier
    }

    /// Creates a notifier and hands back the receiving end of its queue.
    pub fn channel() -> (Self, UnboundedReceiver<NewNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn notify(&self, notification: NewNotification) {
        if self.sender.send(notification).is_err() {
            warn!("Notification worker has stopped; dropping notification");
        }
    }
}

async fn persist_notifications(pool: DbPool, mut receiver: UnboundedReceiver<NewNotification>) {
    while let Some(pending) = receiver.recv().await {
        match notification::create_notification(&pool, &pending).await {
            Ok(saved) => debug!("Notification {} stored for user {}", saved.id, saved.user_id),
            Err(e) => error!(
                "Failed to store notification for user {}: {:?}",
                pending.recipient_id, e
            ),
        }
    }
    debug!("Notification queue closed");
}
