use async_trait::async_trait;
use marquee_domain::PurchaseEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Outbound edge to the messaging collaborator. Fire-and-forget; consumers
/// assume at-least-once delivery.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: PurchaseEvent);
}

/// In-process sink over a tokio broadcast channel. A deployment that needs
/// an external broker bridges a subscriber to it.
pub struct BroadcastSink {
    tx: broadcast::Sender<PurchaseEvent>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<PurchaseEvent>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PurchaseEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn publish(&self, event: PurchaseEvent) {
        // No subscribers is fine.
        if self.tx.send(event).is_err() {
            debug!("Purchase event dropped, no subscribers");
        }
    }
}
