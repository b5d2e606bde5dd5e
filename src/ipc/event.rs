use serde_json::Value;
use tokio::sync::broadcast;

/// Fans JSON-RPC notification strings out to every connected WebSocket
/// client. This is the daemon's only push path: `daemon.ready` at startup
/// and `achievement.unlocked` when the reconciler persists a new unlock.
///
/// Delivery is fire-and-forget. A client that is not subscribed when an
/// unlock fires simply misses the toast; the unlock itself is already in
/// the ledger and shows up in the next `achievements.list`.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<String>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Send a JSON-RPC notification to all connected clients.
    pub fn broadcast(&self, method: &str, params: Value) {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        // Ignore errors — no subscribers is fine
        let _ = self
            .tx
            .send(serde_json::to_string(&notification).unwrap_or_default());
    }

    /// Subscribe to all broadcast events.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Number of currently subscribed clients.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_subscriber_as_notification() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(
            "achievement.unlocked",
            serde_json::json!({ "id": "first_log" }),
        );

        let raw = rx.recv().await.unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["method"], "achievement.unlocked");
        assert_eq!(parsed["params"]["id"], "first_log");
        assert!(parsed.get("id").is_none());
    }

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.broadcast("daemon.ready", serde_json::json!({}));
        assert_eq!(broadcaster.receiver_count(), 0);
    }
}
