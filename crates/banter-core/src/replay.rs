use banter_api::types::NotificationPayload;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// An inbound event held back until the session finishes connecting,
/// tagged with the channel it arrived on.
#[derive(Clone, Debug)]
pub enum ReplayEntry {
    Realtime { topic: String, payload: Vec<u8> },
    Push { notification: NotificationPayload },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Buffering,
    Live,
}

struct Inner {
    phase: Phase,
    queue: VecDeque<ReplayEntry>,
}

/// Arrival-order buffer for the connection window. Starts buffering and
/// flips to live exactly once, when a drain finds the queue empty.
#[derive(Clone)]
pub struct ReplayBuffer {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: Phase::Buffering,
                queue: VecDeque::new(),
            })),
        }
    }
}

impl ReplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// While buffering, queues the entry and returns `None`. Once live,
    /// hands the entry back for immediate dispatch.
    pub async fn admit(&self, entry: ReplayEntry) -> Option<ReplayEntry> {
        let mut guard = self.inner.lock().await;
        match guard.phase {
            Phase::Buffering => {
                guard.queue.push_back(entry);
                None
            }
            Phase::Live => Some(entry),
        }
    }

    /// Pops the next buffered entry. The live transition happens under the
    /// same lock that observes the queue empty.
    pub async fn next_drained(&self) -> Option<ReplayEntry> {
        let mut guard = self.inner.lock().await;
        match guard.queue.pop_front() {
            Some(entry) => Some(entry),
            None => {
                guard.phase = Phase::Live;
                None
            }
        }
    }

    pub async fn is_live(&self) -> bool {
        self.inner.lock().await.phase == Phase::Live
    }
}
