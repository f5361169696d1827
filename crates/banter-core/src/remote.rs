use crate::error::ClientError;
use crate::time::{now_ms, now_us};
use banter_api::types::{
    Credentials, FriendshipAction, InboxSnapshotPayload, SendAck, SessionContext, SessionState,
    ThreadPayload, UserPayload,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// HTTP surface of the platform. Every remote-resolution point the session
/// suspends on goes through this trait.
#[async_trait::async_trait]
pub trait RemoteApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<SessionContext, ClientError>;
    async fn fetch_inbox(&self) -> Result<InboxSnapshotPayload, ClientError>;
    async fn fetch_thread(&self, thread_id: &str) -> Result<ThreadPayload, ClientError>;
    async fn fetch_pending_threads(&self) -> Result<Vec<ThreadPayload>, ClientError>;
    async fn fetch_user(&self, user_id: u64) -> Result<UserPayload, ClientError>;
    async fn resolve_username(&self, username: &str) -> Result<u64, ClientError>;
    async fn create_thread(&self, recipient_ids: &[String]) -> Result<ThreadPayload, ClientError>;
    async fn send_text(
        &self,
        thread_id: &str,
        text: &str,
        client_context: &str,
    ) -> Result<SendAck, ClientError>;
    async fn send_photo(
        &self,
        thread_id: &str,
        jpeg: Vec<u8>,
        client_context: &str,
    ) -> Result<SendAck, ClientError>;
    async fn send_voice(
        &self,
        thread_id: &str,
        audio: Vec<u8>,
        client_context: &str,
    ) -> Result<SendAck, ClientError>;
    async fn friendship_action(
        &self,
        user_id: &str,
        action: FriendshipAction,
    ) -> Result<(), ClientError>;
    async fn approve_thread(&self, thread_id: &str) -> Result<(), ClientError>;
    async fn mark_item_seen(&self, thread_id: &str, item_id: &str) -> Result<(), ClientError>;
    async fn delete_item(&self, thread_id: &str, item_id: &str) -> Result<(), ClientError>;
    async fn set_biography(&self, biography: &str) -> Result<(), ClientError>;
}

/// Scripted remote for tests and offline demos. Reads return configured
/// fixtures, writes are recorded for inspection.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    viewer: Arc<Mutex<Option<UserPayload>>>,
    session_state: Arc<Mutex<Vec<u8>>>,
    inbox_threads: Arc<Mutex<Vec<ThreadPayload>>>,
    pending_threads: Arc<Mutex<Vec<ThreadPayload>>>,
    threads: Arc<Mutex<HashMap<String, ThreadPayload>>>,
    users: Arc<Mutex<HashMap<u64, UserPayload>>>,
    usernames: Arc<Mutex<HashMap<String, u64>>>,
    failing_users: Arc<Mutex<HashSet<u64>>>,
    sent_texts: Arc<Mutex<Vec<(String, String)>>>,
    sent_photos: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    sent_voices: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    sent_contexts: Arc<Mutex<Vec<String>>>,
    actions: Arc<Mutex<Vec<(String, FriendshipAction)>>>,
    approved: Arc<Mutex<Vec<String>>>,
    seen: Arc<Mutex<Vec<(String, String)>>>,
    deleted: Arc<Mutex<Vec<(String, String)>>>,
    biographies: Arc<Mutex<Vec<String>>>,
    queued_acks: Arc<Mutex<VecDeque<SendAck>>>,
    ack_counter: Arc<Mutex<u64>>,
    pending_gate: Arc<Mutex<Option<Arc<Notify>>>>,
    pending_fetches: Arc<Mutex<u32>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_viewer(&self, viewer: UserPayload) {
        self.put_user(viewer.clone()).await;
        *self.viewer.lock().await = Some(viewer);
    }

    pub async fn set_session_state(&self, state: Vec<u8>) {
        *self.session_state.lock().await = state;
    }

    pub async fn put_thread(&self, thread: ThreadPayload) {
        self.threads
            .lock()
            .await
            .insert(thread.thread_id.clone(), thread);
    }

    pub async fn push_inbox_thread(&self, thread: ThreadPayload) {
        self.put_thread(thread.clone()).await;
        self.inbox_threads.lock().await.push(thread);
    }

    pub async fn set_pending_threads(&self, threads: Vec<ThreadPayload>) {
        for thread in &threads {
            self.put_thread(thread.clone()).await;
        }
        *self.pending_threads.lock().await = threads;
    }

    pub async fn put_user(&self, user: UserPayload) {
        if let Some(username) = &user.username {
            self.usernames.lock().await.insert(username.clone(), user.pk);
        }
        self.users.lock().await.insert(user.pk, user);
    }

    pub async fn fail_user_fetch(&self, user_id: u64) {
        self.failing_users.lock().await.insert(user_id);
    }

    pub async fn queue_ack(&self, ack: SendAck) {
        self.queued_acks.lock().await.push_back(ack);
    }

    /// Holds the next pending-thread fetch until the returned gate is
    /// notified. One-shot.
    pub async fn gate_pending_fetch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.pending_gate.lock().await = Some(gate.clone());
        gate
    }

    pub async fn sent_texts(&self) -> Vec<(String, String)> {
        self.sent_texts.lock().await.clone()
    }

    pub async fn sent_photos(&self) -> Vec<(String, Vec<u8>)> {
        self.sent_photos.lock().await.clone()
    }

    pub async fn sent_voices(&self) -> Vec<(String, Vec<u8>)> {
        self.sent_voices.lock().await.clone()
    }

    pub async fn sent_contexts(&self) -> Vec<String> {
        self.sent_contexts.lock().await.clone()
    }

    pub async fn recorded_actions(&self) -> Vec<(String, FriendshipAction)> {
        self.actions.lock().await.clone()
    }

    pub async fn approved_threads(&self) -> Vec<String> {
        self.approved.lock().await.clone()
    }

    pub async fn seen_items(&self) -> Vec<(String, String)> {
        self.seen.lock().await.clone()
    }

    pub async fn deleted_items(&self) -> Vec<(String, String)> {
        self.deleted.lock().await.clone()
    }

    pub async fn recorded_biographies(&self) -> Vec<String> {
        self.biographies.lock().await.clone()
    }

    pub async fn pending_fetch_count(&self) -> u32 {
        *self.pending_fetches.lock().await
    }

    async fn next_ack(&self) -> SendAck {
        if let Some(ack) = self.queued_acks.lock().await.pop_front() {
            return ack;
        }
        let mut counter = self.ack_counter.lock().await;
        *counter += 1;
        SendAck {
            item_id: (8_000_000 + *counter).to_string(),
            timestamp: Some(now_us()),
        }
    }
}

#[async_trait::async_trait]
impl RemoteApi for InMemoryRemote {
    async fn login(&self, _credentials: &Credentials) -> Result<SessionContext, ClientError> {
        let viewer = self
            .viewer
            .lock()
            .await
            .clone()
            .ok_or_else(|| ClientError::Remote("login rejected".to_string()))?;
        let state = SessionState::new(self.session_state.lock().await.clone());
        Ok(SessionContext { viewer, state })
    }

    async fn fetch_inbox(&self) -> Result<InboxSnapshotPayload, ClientError> {
        Ok(InboxSnapshotPayload {
            threads: self.inbox_threads.lock().await.clone(),
            seq_id: Some(1),
            snapshot_at_ms: Some(now_ms()),
        })
    }

    async fn fetch_thread(&self, thread_id: &str) -> Result<ThreadPayload, ClientError> {
        self.threads
            .lock()
            .await
            .get(thread_id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn fetch_pending_threads(&self) -> Result<Vec<ThreadPayload>, ClientError> {
        let gate = self.pending_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        *self.pending_fetches.lock().await += 1;
        Ok(self.pending_threads.lock().await.clone())
    }

    async fn fetch_user(&self, user_id: u64) -> Result<UserPayload, ClientError> {
        if self.failing_users.lock().await.contains(&user_id) {
            return Err(ClientError::Remote(format!("user {user_id} fetch failed")));
        }
        self.users
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn resolve_username(&self, username: &str) -> Result<u64, ClientError> {
        self.usernames
            .lock()
            .await
            .get(username)
            .copied()
            .ok_or(ClientError::NotFound)
    }

    async fn create_thread(&self, recipient_ids: &[String]) -> Result<ThreadPayload, ClientError> {
        let mut counter = self.ack_counter.lock().await;
        *counter += 1;
        let mut thread = ThreadPayload::bare((9_000_000 + *counter).to_string());
        drop(counter);
        let users = self.users.lock().await;
        thread.users = Some(
            recipient_ids
                .iter()
                .filter_map(|id| id.parse::<u64>().ok())
                .filter_map(|pk| users.get(&pk).cloned())
                .collect(),
        );
        drop(users);
        self.put_thread(thread.clone()).await;
        Ok(thread)
    }

    async fn send_text(
        &self,
        thread_id: &str,
        text: &str,
        client_context: &str,
    ) -> Result<SendAck, ClientError> {
        self.sent_contexts
            .lock()
            .await
            .push(client_context.to_string());
        self.sent_texts
            .lock()
            .await
            .push((thread_id.to_string(), text.to_string()));
        Ok(self.next_ack().await)
    }

    async fn send_photo(
        &self,
        thread_id: &str,
        jpeg: Vec<u8>,
        client_context: &str,
    ) -> Result<SendAck, ClientError> {
        self.sent_contexts
            .lock()
            .await
            .push(client_context.to_string());
        self.sent_photos
            .lock()
            .await
            .push((thread_id.to_string(), jpeg));
        Ok(self.next_ack().await)
    }

    async fn send_voice(
        &self,
        thread_id: &str,
        audio: Vec<u8>,
        client_context: &str,
    ) -> Result<SendAck, ClientError> {
        self.sent_contexts
            .lock()
            .await
            .push(client_context.to_string());
        self.sent_voices
            .lock()
            .await
            .push((thread_id.to_string(), audio));
        Ok(self.next_ack().await)
    }

    async fn friendship_action(
        &self,
        user_id: &str,
        action: FriendshipAction,
    ) -> Result<(), ClientError> {
        self.actions
            .lock()
            .await
            .push((user_id.to_string(), action));
        Ok(())
    }

    async fn approve_thread(&self, thread_id: &str) -> Result<(), ClientError> {
        self.approved.lock().await.push(thread_id.to_string());
        Ok(())
    }

    async fn mark_item_seen(&self, thread_id: &str, item_id: &str) -> Result<(), ClientError> {
        self.seen
            .lock()
            .await
            .push((thread_id.to_string(), item_id.to_string()));
        Ok(())
    }

    async fn delete_item(&self, thread_id: &str, item_id: &str) -> Result<(), ClientError> {
        self.deleted
            .lock()
            .await
            .push((thread_id.to_string(), item_id.to_string()));
        Ok(())
    }

    async fn set_biography(&self, biography: &str) -> Result<(), ClientError> {
        self.biographies.lock().await.push(biography.to_string());
        Ok(())
    }
}
