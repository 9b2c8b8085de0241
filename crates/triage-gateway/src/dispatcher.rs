use std::sync::Arc;

use tokio::sync::broadcast;

use triage_types::events::GatewayEvent;

/// Fan-out hub for gateway events. Handlers publish here after a write
/// succeeds; each WebSocket connection holds a receiver and filters by
/// its own subscriptions and visibility before forwarding.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GatewayEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event to all connected clients. Best-effort: with no
    /// connected receivers the event is dropped, which is fine — clients
    /// re-fetch state on connect.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_types::models::TicketStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        let ticket_id = Uuid::new_v4();
        dispatcher.broadcast(GatewayEvent::TicketStatusUpdate {
            ticket_id,
            owner_id: Uuid::new_v4(),
            status: TicketStatus::Closed,
            updated_at: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            GatewayEvent::TicketStatusUpdate { ticket_id: got, .. } => {
                assert_eq!(got, ticket_id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
