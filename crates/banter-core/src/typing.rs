use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug)]
pub struct TypingOptions {
    /// Time until the indicator stops on its own. `None` takes the
    /// configured default.
    pub duration_ms: Option<u64>,
    pub disable_on_send: bool,
}

impl Default for TypingOptions {
    fn default() -> Self {
        Self {
            duration_ms: None,
            disable_on_send: true,
        }
    }
}

/// Background tasks keeping one chat's indicator alive.
pub struct TypingSession {
    pub keep_alive: JoinHandle<()>,
    pub expiry: JoinHandle<()>,
    pub disable_on_send: bool,
}

impl TypingSession {
    fn abort(&self) {
        self.keep_alive.abort();
        self.expiry.abort();
    }
}

/// At most one typing session per chat. Inserting over a live session
/// aborts the old one.
#[derive(Clone, Default)]
pub struct TypingRegistry {
    inner: Arc<Mutex<HashMap<String, TypingSession>>>,
}

impl TypingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, chat_id: impl Into<String>, session: TypingSession) {
        if let Some(previous) = self.inner.lock().await.insert(chat_id.into(), session) {
            previous.abort();
        }
    }

    pub async fn remove(&self, chat_id: &str) -> bool {
        match self.inner.lock().await.remove(chat_id) {
            Some(session) => {
                session.abort();
                true
            }
            None => false,
        }
    }

    pub async fn stops_on_send(&self, chat_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .get(chat_id)
            .map(|s| s.disable_on_send)
            .unwrap_or(false)
    }

    pub async fn clear(&self) {
        for (_, session) in self.inner.lock().await.drain() {
            session.abort();
        }
    }
}
