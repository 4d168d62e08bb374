//! In-memory event bus implementation using a tokio broadcast channel.
//!
//! This implementation is suitable for:
//! - Single process deployments where the relay and the dispatcher share a runtime
//! - Development and testing

use async_trait::async_trait;
use metrics::counter;
use porter_events::{EventBus, EventBusError, EventStream, GatewayEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 256;

/// In-memory event bus using a tokio broadcast channel.
///
/// Events are only broadcast within a single process.
pub struct MemoryEventBus {
    tx: broadcast::Sender<GatewayEvent>,
    dropped: Arc<AtomicU64>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Events lost to lagging subscribers since the bus was created.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: GatewayEvent) -> Result<(), EventBusError> {
        // Ignore error if no receivers (this is fine)
        let _ = self.tx.send(event);

        Ok(())
    }

    async fn subscribe(&self) -> Result<EventStream, EventBusError> {
        let rx = self.tx.subscribe();

        // A lagging receiver loses the oldest events. Invite state recovers on the next Ready
        // event or join diff; skipped joins do not, so every loss is logged and counted.
        let dropped = self.dropped.clone();
        let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                dropped.fetch_add(skipped, Ordering::Relaxed);
                counter!("porter_events_dropped_total").increment(skipped);
                warn!(skipped, "Event subscriber lagged, gateway events were dropped");
                None
            }
        });

        Ok(Box::pin(stream))
    }
}
