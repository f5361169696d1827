pub mod attachment;
pub mod chat;
pub mod collector;
pub mod config;
pub mod correlate;
pub mod error;
pub mod event;
pub mod message;
pub mod paths;
pub mod pending;
pub mod push;
pub mod realtime;
pub mod reconcile;
pub mod remote;
pub mod replay;
pub mod store;
pub mod time;
pub mod typing;
pub mod user;

use attachment::Attachment;
use banter_api::types::{
    BootstrapSnapshot, Credentials, FriendshipAction, NotificationPayload, SendAck, SessionState,
};
use banter_api::validation::{
    validate_biography, validate_credentials, validate_item_id, validate_recipients,
    validate_text, validate_thread_id, validate_username,
};
use chat::Chat;
use collector::{CollectorOptions, MessageCollector};
use config::ClientConfig;
use correlate::{new_client_context, SendCorrelator};
use error::ClientError;
use event::{ClientEvent, EventBus, EventReceiver};
use message::Message;
use pending::PendingTracker;
use push::PushTransport;
use realtime::{RealtimeSignal, RealtimeTransport};
use reconcile::Reconciler;
use remote::RemoteApi;
use replay::{ReplayBuffer, ReplayEntry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use store::Store;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};
use typing::{TypingOptions, TypingRegistry, TypingSession};
use user::{ClientUser, User};

/// One logged-in session. `login` bootstraps the HTTP side and seeds the
/// entity cache; `connect` brings up the realtime and push channels,
/// replays anything that arrived meanwhile and announces `Connected`.
/// Subscribe between the two calls to observe the session from its first
/// event.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    remote: Arc<dyn RemoteApi>,
    realtime: Arc<dyn RealtimeTransport>,
    push: Arc<dyn PushTransport>,
    store: Store,
    events: EventBus,
    correlator: SendCorrelator,
    replay: ReplayBuffer,
    typing: TypingRegistry,
    reconciler: Reconciler,
    tracker: PendingTracker,
    viewer: ClientUser,
    session: SessionState,
    bootstrap: BootstrapSnapshot,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Client {
    pub async fn login(
        config: ClientConfig,
        credentials: &Credentials,
        remote: Arc<dyn RemoteApi>,
        realtime: Arc<dyn RealtimeTransport>,
        push: Arc<dyn PushTransport>,
    ) -> Result<Self, ClientError> {
        validate_credentials(credentials)?;
        let context = remote.login(credentials).await?;

        let store = Store::new();
        let events = EventBus::new(config.event_capacity);
        let correlator = SendCorrelator::new();
        let rules = config.story_share.clone();
        let reconciler = Reconciler::new(
            store.clone(),
            events.clone(),
            correlator.clone(),
            remote.clone(),
            rules.clone(),
        );
        let tracker = PendingTracker::new(
            store.clone(),
            events.clone(),
            remote.clone(),
            rules.clone(),
        );

        store.get_or_create_user(&context.viewer).await;
        let viewer = ClientUser::new(&context.viewer);

        let inbox = remote.fetch_inbox().await?;
        for thread in &inbox.threads {
            store.merge_thread(thread, &rules).await;
        }
        info!(
            viewer = %viewer.user.id,
            threads = inbox.threads.len(),
            "logged in"
        );

        Ok(Self {
            config,
            remote,
            realtime,
            push,
            store,
            events,
            correlator,
            replay: ReplayBuffer::new(),
            typing: TypingRegistry::new(),
            reconciler,
            tracker,
            viewer,
            session: context.state,
            bootstrap: BootstrapSnapshot {
                seq_id: inbox.seq_id,
                snapshot_at_ms: inbox.snapshot_at_ms,
            },
            tasks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Connects both channels, refetches pending requests, replays buffered
    /// events in arrival order and goes live.
    pub async fn connect(&self) -> Result<(), ClientError> {
        if self.ready().await {
            return Ok(());
        }
        let realtime_rx = self.realtime.connect(self.bootstrap.clone()).await?;
        self.realtime
            .set_foreground_state(true, self.config.foreground_keep_alive_secs)
            .await?;
        self.spawn_realtime_ingest(realtime_rx).await;
        let push_rx = self.push.connect().await?;
        self.spawn_push_ingest(push_rx).await;

        let pending = self.remote.fetch_pending_threads().await?;
        self.store
            .apply_pending_refetch(&pending, &self.config.story_share)
            .await;

        while let Some(entry) = self.replay.next_drained().await {
            self.dispatch(entry).await;
        }
        self.events.publish(ClientEvent::Connected);
        info!("session live");
        Ok(())
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub async fn ready(&self) -> bool {
        self.replay.is_live().await
    }

    /// Opaque credentials blob for resuming this session later.
    pub fn session_state(&self) -> SessionState {
        self.session.clone()
    }

    pub async fn viewer(&self) -> ClientUser {
        let mut viewer = self.viewer.clone();
        if let Some(user) = self.store.user(&viewer.user.id).await {
            viewer.user = user;
        }
        viewer
    }

    /// Looks up a user by numeric ID or username. Cached users are
    /// returned without a remote call.
    pub async fn fetch_user(&self, query: &str) -> Result<User, ClientError> {
        let pk: u64 = if paths::is_id(query) {
            if let Some(user) = self.store.user(query).await {
                return Ok(user);
            }
            query
                .parse()
                .map_err(|_| ClientError::Parse(format!("user id {query}")))?
        } else {
            validate_username(query, &self.config.limits)?;
            self.remote.resolve_username(query).await?
        };
        if let Some(user) = self.store.user(&pk.to_string()).await {
            return Ok(user);
        }
        let payload = self.remote.fetch_user(pk).await?;
        Ok(self.store.get_or_create_user(&payload).await)
    }

    pub async fn fetch_chat(&self, chat_id: &str) -> Result<Chat, ClientError> {
        validate_thread_id(chat_id)?;
        if let Some(chat) = self.store.chat(chat_id).await {
            return Ok(chat);
        }
        let payload = self.remote.fetch_thread(chat_id).await?;
        let (chat, _) = self
            .store
            .merge_thread(&payload, &self.config.story_share)
            .await;
        Ok(chat)
    }

    pub async fn create_chat(&self, recipient_user_ids: &[String]) -> Result<Chat, ClientError> {
        validate_recipients(recipient_user_ids)?;
        let payload = self.remote.create_thread(recipient_user_ids).await?;
        let (chat, _) = self
            .store
            .merge_thread(&payload, &self.config.story_share)
            .await;
        Ok(chat)
    }

    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<Message, ClientError> {
        validate_thread_id(chat_id)?;
        validate_text(text, &self.config.limits)?;
        let context = new_client_context();
        let ack = self.remote.send_text(chat_id, text, &context).await?;
        self.send_correlated(chat_id, ack).await
    }

    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo: Attachment,
    ) -> Result<Message, ClientError> {
        validate_thread_id(chat_id)?;
        let context = new_client_context();
        let ack = self
            .remote
            .send_photo(chat_id, photo.into_jpeg(), &context)
            .await?;
        self.send_correlated(chat_id, ack).await
    }

    pub async fn send_voice(
        &self,
        chat_id: &str,
        audio: Vec<u8>,
    ) -> Result<Message, ClientError> {
        validate_thread_id(chat_id)?;
        if audio.is_empty() {
            return Err(ClientError::Validation("empty audio".to_string()));
        }
        let context = new_client_context();
        let ack = self.remote.send_voice(chat_id, audio, &context).await?;
        self.send_correlated(chat_id, ack).await
    }

    /// Resolves a send against its realtime echo, whichever lands first.
    async fn send_correlated(
        &self,
        chat_id: &str,
        ack: SendAck,
    ) -> Result<Message, ClientError> {
        if self.typing.stops_on_send(chat_id).await {
            self.stop_typing(chat_id).await?;
        }
        let rx = self.correlator.register(ack.item_id.clone()).await;
        if let Some(message) = self.store.find_message(chat_id, &ack.item_id).await {
            self.correlator.forget(&ack.item_id).await;
            return Ok(message);
        }
        rx.await.map_err(|_| ClientError::Closed)
    }

    pub async fn mark_seen(&self, chat_id: &str, item_id: &str) -> Result<(), ClientError> {
        validate_thread_id(chat_id)?;
        validate_item_id(item_id)?;
        self.remote.mark_item_seen(chat_id, item_id).await
    }

    pub async fn delete_message(&self, chat_id: &str, item_id: &str) -> Result<(), ClientError> {
        validate_thread_id(chat_id)?;
        validate_item_id(item_id)?;
        self.remote.delete_item(chat_id, item_id).await
    }

    /// Accepts a pending chat and announces its first message.
    pub async fn approve_chat(&self, chat_id: &str) -> Result<Chat, ClientError> {
        validate_thread_id(chat_id)?;
        if !self.store.has_chat(chat_id).await {
            self.fetch_chat(chat_id).await?;
        }
        self.remote.approve_thread(chat_id).await?;
        let chat = self
            .store
            .mark_approved(chat_id)
            .await
            .ok_or(ClientError::NotFound)?;
        if let Some(message) = chat.first_message() {
            self.events.publish(ClientEvent::MessageCreate(message.clone()));
        }
        Ok(chat)
    }

    pub async fn follow(&self, user_id: &str) -> Result<(), ClientError> {
        self.friendship(user_id, FriendshipAction::Follow).await
    }

    pub async fn unfollow(&self, user_id: &str) -> Result<(), ClientError> {
        self.friendship(user_id, FriendshipAction::Unfollow).await
    }

    pub async fn block(&self, user_id: &str) -> Result<(), ClientError> {
        self.friendship(user_id, FriendshipAction::Block).await
    }

    pub async fn unblock(&self, user_id: &str) -> Result<(), ClientError> {
        self.friendship(user_id, FriendshipAction::Unblock).await
    }

    pub async fn approve_follow(&self, user_id: &str) -> Result<(), ClientError> {
        self.friendship(user_id, FriendshipAction::ApproveFollow).await
    }

    pub async fn deny_follow(&self, user_id: &str) -> Result<(), ClientError> {
        self.friendship(user_id, FriendshipAction::DenyFollow).await
    }

    pub async fn remove_follower(&self, user_id: &str) -> Result<(), ClientError> {
        self.friendship(user_id, FriendshipAction::RemoveFollower).await
    }

    async fn friendship(
        &self,
        user_id: &str,
        action: FriendshipAction,
    ) -> Result<(), ClientError> {
        if !paths::is_id(user_id) {
            return Err(ClientError::Validation(format!("user id {user_id}")));
        }
        self.remote.friendship_action(user_id, action).await
    }

    pub async fn set_biography(&self, biography: &str) -> Result<(), ClientError> {
        validate_biography(biography, &self.config.limits)?;
        self.remote.set_biography(biography).await?;
        self.store
            .set_user_biography(&self.viewer.user.id, biography)
            .await;
        Ok(())
    }

    pub async fn set_foreground_state(&self, in_app: bool) -> Result<(), ClientError> {
        self.realtime
            .set_foreground_state(in_app, self.config.foreground_keep_alive_secs)
            .await
    }

    /// Announces typing in a chat and keeps the indicator alive until the
    /// duration passes, `stop_typing` is called or a send goes out.
    pub async fn start_typing(
        &self,
        chat_id: &str,
        options: TypingOptions,
    ) -> Result<(), ClientError> {
        validate_thread_id(chat_id)?;
        self.realtime.indicate_activity(chat_id, true).await?;
        self.store.set_typing(chat_id, true).await;

        let keep_alive = {
            let realtime = self.realtime.clone();
            let chat = chat_id.to_string();
            let period = Duration::from_millis(self.config.typing_keep_alive_ms);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let _ = realtime.indicate_activity(&chat, true).await;
                }
            })
        };
        let expiry = {
            let client = self.clone();
            let chat = chat_id.to_string();
            let duration = Duration::from_millis(
                options
                    .duration_ms
                    .unwrap_or(self.config.typing_default_duration_ms),
            );
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                let _ = client.realtime.indicate_activity(&chat, false).await;
                client.store.set_typing(&chat, false).await;
                client.typing.remove(&chat).await;
            })
        };
        self.typing
            .insert(
                chat_id,
                TypingSession {
                    keep_alive,
                    expiry,
                    disable_on_send: options.disable_on_send,
                },
            )
            .await;
        Ok(())
    }

    pub async fn stop_typing(&self, chat_id: &str) -> Result<(), ClientError> {
        if self.typing.remove(chat_id).await {
            self.store.set_typing(chat_id, false).await;
            self.realtime.indicate_activity(chat_id, false).await?;
        }
        Ok(())
    }

    pub fn message_collector(
        &self,
        chat_id: &str,
        filter: impl Fn(&Message) -> bool + Send + 'static,
        options: CollectorOptions,
    ) -> MessageCollector {
        MessageCollector::new(self.subscribe(), chat_id, filter, options)
    }

    pub async fn to_json(&self) -> Value {
        json!({
            "ready": self.ready().await,
            "userID": self.viewer.user.id,
        })
    }

    /// Tears the session down. Safe to call more than once.
    pub async fn logout(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.typing.clear().await;
        self.correlator.clear().await;
        self.realtime.disconnect().await;
        self.push.disconnect().await;
        info!("session closed");
    }

    async fn spawn_realtime_ingest(&self, mut rx: mpsc::Receiver<RealtimeSignal>) {
        let client = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                match signal {
                    RealtimeSignal::Receive { topic, payload } => {
                        let entry = ReplayEntry::Realtime { topic, payload };
                        if let Some(entry) = client.replay.admit(entry).await {
                            client.dispatch(entry).await;
                        }
                    }
                    RealtimeSignal::Error { reason } => {
                        warn!(%reason, "realtime error");
                        client
                            .events
                            .publish(ClientEvent::Disconnected { reason });
                    }
                    RealtimeSignal::Closed => {
                        client.events.publish(ClientEvent::Disconnected {
                            reason: "connection closed".to_string(),
                        });
                        break;
                    }
                }
            }
        });
        self.tasks.lock().await.push(handle);
    }

    async fn spawn_push_ingest(&self, mut rx: mpsc::Receiver<NotificationPayload>) {
        let client = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let entry = ReplayEntry::Push { notification };
                if let Some(entry) = client.replay.admit(entry).await {
                    client.dispatch(entry).await;
                }
            }
            trace!("push channel closed");
        });
        self.tasks.lock().await.push(handle);
    }

    async fn dispatch(&self, entry: ReplayEntry) {
        match entry {
            ReplayEntry::Realtime { topic, payload } => {
                self.reconciler.handle_topic(&topic, &payload).await;
            }
            ReplayEntry::Push { notification } => {
                if let Err(err) = self.tracker.handle_notification(notification).await {
                    warn!(%err, "notification handling failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
