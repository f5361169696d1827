use crate::error::ClientError;
use banter_api::types::{BootstrapSnapshot, RealtimeEnvelope};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Topic carrying direct-message mutation envelopes. Other topics are
/// ignored by the session.
pub const MESSAGE_SYNC_TOPIC: &str = "146";

#[derive(Clone, Debug)]
pub enum RealtimeSignal {
    Receive { topic: String, payload: Vec<u8> },
    Error { reason: String },
    Closed,
}

/// Always-on socket to the platform. `connect` hands back the signal
/// stream; the other calls are fire-and-forget commands on the socket.
#[async_trait::async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn connect(
        &self,
        snapshot: BootstrapSnapshot,
    ) -> Result<mpsc::Receiver<RealtimeSignal>, ClientError>;
    async fn set_foreground_state(
        &self,
        in_app: bool,
        keep_alive_secs: u64,
    ) -> Result<(), ClientError>;
    async fn indicate_activity(&self, thread_id: &str, active: bool) -> Result<(), ClientError>;
    async fn disconnect(&self);
}

/// Hand-driven transport for tests. Signals pushed through `emit` appear
/// on the stream handed out by `connect`.
#[derive(Clone, Default)]
pub struct MockRealtime {
    sender: Arc<Mutex<Option<mpsc::Sender<RealtimeSignal>>>>,
    connected_with: Arc<Mutex<Option<BootstrapSnapshot>>>,
    foreground: Arc<Mutex<Vec<(bool, u64)>>>,
    activity: Arc<Mutex<Vec<(String, bool)>>>,
}

impl MockRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn emit(&self, signal: RealtimeSignal) {
        let sender = self.sender.lock().await.clone();
        if let Some(sender) = sender {
            let _ = sender.send(signal).await;
        }
    }

    pub async fn emit_ops(&self, topic: &str, envelopes: Vec<RealtimeEnvelope>) {
        let payload = serde_json::to_vec(&envelopes).unwrap_or_default();
        self.emit(RealtimeSignal::Receive {
            topic: topic.to_string(),
            payload,
        })
        .await;
    }

    pub async fn connected_with(&self) -> Option<BootstrapSnapshot> {
        self.connected_with.lock().await.clone()
    }

    pub async fn foreground_calls(&self) -> Vec<(bool, u64)> {
        self.foreground.lock().await.clone()
    }

    pub async fn activity_calls(&self) -> Vec<(String, bool)> {
        self.activity.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl RealtimeTransport for MockRealtime {
    async fn connect(
        &self,
        snapshot: BootstrapSnapshot,
    ) -> Result<mpsc::Receiver<RealtimeSignal>, ClientError> {
        let (tx, rx) = mpsc::channel(64);
        *self.sender.lock().await = Some(tx);
        *self.connected_with.lock().await = Some(snapshot);
        Ok(rx)
    }

    async fn set_foreground_state(
        &self,
        in_app: bool,
        keep_alive_secs: u64,
    ) -> Result<(), ClientError> {
        self.foreground.lock().await.push((in_app, keep_alive_secs));
        Ok(())
    }

    async fn indicate_activity(&self, thread_id: &str, active: bool) -> Result<(), ClientError> {
        self.activity
            .lock()
            .await
            .push((thread_id.to_string(), active));
        Ok(())
    }

    async fn disconnect(&self) {
        *self.sender.lock().await = None;
    }
}
