use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use actiontrail_core_types::TrailError;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    /// Returns how many subscribers saw the event. Zero is not an error.
    async fn publish(&self, event: E) -> Result<usize, TrailError>;
    fn subscribe(&self) -> Subscription<E>;
}

/// In-memory broadcast bus. Slow subscribers lose the oldest events.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<usize, TrailError> {
        // send only fails when nobody listens
        Ok(self.sender.send(event).unwrap_or(0))
    }

    fn subscribe(&self) -> Subscription<E> {
        Subscription {
            inner: self.sender.subscribe(),
        }
    }
}

/// Receiving half of a bus subscription.
pub struct Subscription<E>
where
    E: Event,
{
    inner: broadcast::Receiver<E>,
}

impl<E> Subscription<E>
where
    E: Event,
{
    /// Next event, skipping over any gap left by lagging. `None` once the
    /// bus is dropped.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(target: "event_bus", skipped, "subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant used by tests and drain loops.
    pub fn try_recv(&mut self) -> Option<E> {
        loop {
            match self.inner.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(target: "event_bus", skipped, "subscriber lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }
}

/// Helper to materialise an mpsc receiver from the bus subscription
/// so callers can await events without handling broadcast semantics directly.
pub fn to_mpsc<E, B>(bus: &B, capacity: usize) -> mpsc::Receiver<E>
where
    E: Event,
    B: EventBus<E> + ?Sized,
{
    let mut subscription = bus.subscribe();
    let (tx, out_rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });
    out_rx
}
