use crate::error::ClientError;
use banter_api::types::NotificationPayload;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Out-of-band notification channel. Payloads arrive already decoded.
#[async_trait::async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(&self) -> Result<mpsc::Receiver<NotificationPayload>, ClientError>;
    async fn disconnect(&self);
}

#[derive(Clone, Default)]
pub struct MockPush {
    sender: Arc<Mutex<Option<mpsc::Sender<NotificationPayload>>>>,
}

impl MockPush {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn emit(&self, notification: NotificationPayload) {
        let sender = self.sender.lock().await.clone();
        if let Some(sender) = sender {
            let _ = sender.send(notification).await;
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.sender.lock().await.is_some()
    }
}

#[async_trait::async_trait]
impl PushTransport for MockPush {
    async fn connect(&self) -> Result<mpsc::Receiver<NotificationPayload>, ClientError> {
        let (tx, rx) = mpsc::channel(64);
        *self.sender.lock().await = Some(tx);
        Ok(rx)
    }

    async fn disconnect(&self) {
        *self.sender.lock().await = None;
    }
}
