use crate::message::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::trace;

/// Token attached to an outbound send. The platform carries it through to
/// the realtime echo of the same item.
pub fn new_client_context() -> String {
    uuid::Uuid::new_v4().to_string().to_uppercase()
}

/// Matches outbound sends to their echo on the realtime channel. One
/// single-shot slot per acknowledged item ID.
#[derive(Clone, Default)]
pub struct SendCorrelator {
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>,
}

impl SendCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, item_id: impl Into<String>) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(item_id.into(), tx);
        rx
    }

    /// Resolves a waiting send. Returns whether a sender was registered.
    pub async fn fulfill(&self, item_id: &str, message: Message) -> bool {
        let sender = self.pending.lock().await.remove(item_id);
        match sender {
            Some(tx) => {
                trace!(item_id, "matched sent message echo");
                let _ = tx.send(message);
                true
            }
            None => false,
        }
    }

    pub async fn forget(&self, item_id: &str) -> bool {
        self.pending.lock().await.remove(item_id).is_some()
    }

    pub async fn clear(&self) {
        self.pending.lock().await.clear();
    }
}
