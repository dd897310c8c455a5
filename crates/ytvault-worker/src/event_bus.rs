//! Best-effort broadcast of job events to connected subscribers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use ytvault_models::{Job, Notification, ProgressSnapshot, ServerEvent};

use crate::metrics;

pub type SubscriberId = u64;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Subscriber {0} is gone")]
    Disconnected(SubscriberId),

    #[error("Push to subscriber {id} failed: {reason}")]
    Failed { id: SubscriberId, reason: String },
}

/// Delivery mechanism underneath the [`EventBus`].
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Currently connected subscribers.
    async fn subscribers(&self) -> Vec<SubscriberId>;

    /// Deliver one event to one subscriber.
    async fn push(&self, to: SubscriberId, event: &ServerEvent) -> Result<(), PushError>;
}

/// In-process transport: one unbounded channel per subscriber.
///
/// WebSocket sessions subscribe on connect and drain their receiver into
/// the socket.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    next_id: AtomicU64,
    senders: RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        match self.senders.write() {
            Ok(mut senders) => {
                senders.insert(id, tx);
            }
            Err(e) => error!("RwLock poisoned writing subscribers: {e}"),
        }
        debug!(subscriber = id, "Subscriber connected");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        match self.senders.write() {
            Ok(mut senders) => {
                senders.remove(&id);
            }
            Err(e) => error!("RwLock poisoned writing subscribers: {e}"),
        }
        debug!(subscriber = id, "Subscriber disconnected");
    }

    pub fn len(&self) -> usize {
        self.senders.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationTransport for ChannelTransport {
    async fn subscribers(&self) -> Vec<SubscriberId> {
        match self.senders.read() {
            Ok(senders) => senders.keys().copied().collect(),
            Err(e) => {
                error!("RwLock poisoned reading subscribers: {e}");
                Vec::new()
            }
        }
    }

    async fn push(&self, to: SubscriberId, event: &ServerEvent) -> Result<(), PushError> {
        let sender = match self.senders.read() {
            Ok(senders) => senders.get(&to).cloned(),
            Err(e) => {
                return Err(PushError::Failed {
                    id: to,
                    reason: e.to_string(),
                })
            }
        };
        let sender = sender.ok_or(PushError::Disconnected(to))?;
        if sender.send(event.clone()).is_err() {
            self.unsubscribe(to);
            return Err(PushError::Disconnected(to));
        }
        Ok(())
    }
}

/// Publishes `message`, `status_update` and `notify` events to every
/// connected subscriber. Nothing is buffered for late subscribers.
#[derive(Clone)]
pub struct EventBus {
    transport: Arc<dyn NotificationTransport>,
}

impl EventBus {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self { transport }
    }

    /// Send `event` to all subscribers; returns how many received it.
    ///
    /// A failed push is logged and does not affect the other subscribers.
    pub async fn publish(&self, event: ServerEvent) -> usize {
        let mut delivered = 0;
        for id in self.transport.subscribers().await {
            match self.transport.push(id, &event).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(subscriber = id, event = event.name(), "Push failed: {}", e);
                    metrics::record_push_failure();
                }
            }
        }
        metrics::record_event_published(event.name());
        delivered
    }

    /// Full job record after a persisted change.
    pub async fn message(&self, job: &Job) -> usize {
        self.publish(ServerEvent::Message(job.clone())).await
    }

    pub async fn status_update(&self, snapshot: ProgressSnapshot) -> usize {
        self.publish(ServerEvent::StatusUpdate(snapshot)).await
    }

    pub async fn notify(&self, notification: Notification) -> usize {
        self.publish(ServerEvent::Notify(notification)).await
    }
}
