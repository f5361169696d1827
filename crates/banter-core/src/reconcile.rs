//! Applies realtime mutation envelopes to the entity store and announces
//! the resulting state changes.
//!
//! Op handling is ordered: for one thread payload the announcements go
//! name change, member add, member remove, call start, call end. A failed
//! op is logged and skipped without disturbing the rest of its envelope.

use crate::chat::Chat;
use crate::config::StoryShareRules;
use crate::correlate::SendCorrelator;
use crate::error::ClientError;
use crate::event::{ClientEvent, EventBus};
use crate::message::MessageKind;
use crate::paths;
use crate::realtime::MESSAGE_SYNC_TOPIC;
use crate::remote::RemoteApi;
use crate::store::Store;
use crate::time::now_ms;
use crate::user::User;
use banter_api::types::{
    RealtimeEnvelope, RealtimeOp, RealtimeOpKind, ThreadItemPayload, ThreadPayload,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// How long after its own timestamp a freshly added message is still
/// announced. Items older than this replay silently into the cache.
pub const MESSAGE_VALIDITY_WINDOW_MS: u64 = 10_000;

pub fn is_message_valid(timestamp_us: u64) -> bool {
    timestamp_us / 1000 + MESSAGE_VALIDITY_WINDOW_MS > now_ms()
}

#[derive(Clone)]
pub struct Reconciler {
    store: Store,
    events: EventBus,
    correlator: SendCorrelator,
    remote: Arc<dyn RemoteApi>,
    rules: StoryShareRules,
}

impl Reconciler {
    pub fn new(
        store: Store,
        events: EventBus,
        correlator: SendCorrelator,
        remote: Arc<dyn RemoteApi>,
        rules: StoryShareRules,
    ) -> Self {
        Self {
            store,
            events,
            correlator,
            remote,
            rules,
        }
    }

    /// Entry point for one realtime frame. Only the message sync topic is
    /// decoded; everything else is dropped here.
    pub async fn handle_topic(&self, topic: &str, payload: &[u8]) {
        if topic != MESSAGE_SYNC_TOPIC {
            trace!(topic, "ignoring realtime topic");
            return;
        }
        let envelopes: Vec<RealtimeEnvelope> = match serde_json::from_slice(payload) {
            Ok(envelopes) => envelopes,
            Err(err) => {
                warn!(%err, "undecodable sync frame");
                return;
            }
        };
        for envelope in envelopes {
            self.apply_envelope(envelope).await;
        }
    }

    pub async fn apply_envelope(&self, envelope: RealtimeEnvelope) {
        let Some(ops) = envelope.data else {
            return;
        };
        for op in ops {
            if let Err(err) = self.apply_op(&op).await {
                warn!(path = %op.path, %err, "sync op failed");
            }
        }
    }

    async fn apply_op(&self, op: &RealtimeOp) -> Result<(), ClientError> {
        match op.op {
            RealtimeOpKind::Add => {
                if paths::is_admin_path(&op.path) {
                    self.admin_add(op).await
                } else {
                    self.message_add(op).await
                }
            }
            RealtimeOpKind::Replace => {
                if paths::is_message_path(&op.path) {
                    self.message_replace(op).await
                } else if paths::is_inbox_thread_path(&op.path) {
                    self.thread_replace(op).await
                } else {
                    trace!(path = %op.path, "unhandled replace path");
                    Ok(())
                }
            }
            RealtimeOpKind::Remove => {
                if paths::is_admin_path(&op.path) {
                    self.admin_remove(op).await
                } else {
                    self.message_remove(op).await
                }
            }
            RealtimeOpKind::Other => {
                trace!(path = %op.path, "unhandled op kind");
                Ok(())
            }
        }
    }

    /// New item in a thread. Resolves the send correlation first, then
    /// announces the message if it is still inside its validity window.
    async fn message_add(&self, op: &RealtimeOp) -> Result<(), ClientError> {
        let thread_id = paths::extract_thread_from_item_path(&op.path)?;
        self.ensure_chat(&thread_id).await?;
        let item = decode_item(op)?;
        let Some(kind) = MessageKind::from_raw(&item.item_type) else {
            trace!(path = %op.path, "skipping unmodeled item type");
            return Ok(());
        };
        if kind.is_bookkeeping() {
            trace!(path = %op.path, "skipping bookkeeping item");
            return Ok(());
        }
        let merge = self.store.merge_message(&thread_id, &item, &self.rules).await;
        let Some(message) = merge.message else {
            return Ok(());
        };
        self.correlator.fulfill(&message.id, message.clone()).await;
        if !merge.created {
            return Ok(());
        }
        if is_message_valid(message.timestamp) {
            self.events.publish(ClientEvent::MessageCreate(message));
        } else {
            trace!(item_id = %message.id, "suppressing stale message");
        }
        Ok(())
    }

    /// Item-level update. A like diff announces removals before additions.
    async fn message_replace(&self, op: &RealtimeOp) -> Result<(), ClientError> {
        let (thread_id, _item_id) = paths::extract_message_path(&op.path)?;
        self.ensure_chat(&thread_id).await?;
        let item = decode_item(op)?;
        let merge = self.store.merge_message(&thread_id, &item, &self.rules).await;
        let (Some(message), Some(diff)) = (merge.message, merge.like_diff) else {
            return Ok(());
        };
        for like in &diff.removed {
            let user = self.resolve_user(&like.user_id).await?;
            self.events.publish(ClientEvent::LikeRemove {
                user,
                message: message.clone(),
            });
        }
        for like in &diff.added {
            let user = self.resolve_user(&like.user_id).await?;
            self.events.publish(ClientEvent::LikeAdd {
                user,
                message: message.clone(),
            });
        }
        Ok(())
    }

    /// Thread-level update. Emits at most one event per change category,
    /// in fixed order.
    async fn thread_replace(&self, op: &RealtimeOp) -> Result<(), ClientError> {
        paths::extract_inbox_thread_path(&op.path)?;
        let payload = decode_thread(op)?;
        let (chat, diff) = self.store.merge_thread(&payload, &self.rules).await;
        let Some(diff) = diff else {
            return Ok(());
        };
        if let Some((old_name, new_name)) = diff.name_change {
            self.events.publish(ClientEvent::ChatNameUpdate {
                chat: chat.clone(),
                old_name,
                new_name,
            });
        }
        if let Some(user_id) = diff.added_member {
            let user = self.resolve_user(&user_id).await?;
            self.events.publish(ClientEvent::ChatUserAdd {
                chat: chat.clone(),
                user,
            });
        }
        if let Some(user_id) = diff.removed_member {
            let user = self.resolve_user(&user_id).await?;
            self.events.publish(ClientEvent::ChatUserRemove {
                chat: chat.clone(),
                user,
            });
        }
        if diff.call_started {
            self.events.publish(ClientEvent::CallStart(chat.clone()));
        }
        if diff.call_ended {
            self.events.publish(ClientEvent::CallEnd(chat));
        }
        Ok(())
    }

    async fn admin_add(&self, op: &RealtimeOp) -> Result<(), ClientError> {
        let (thread_id, user_id) = paths::extract_admin_path(&op.path)?;
        self.ensure_chat(&thread_id).await?;
        let user = self.resolve_user(&user_id).await?;
        if let Some(chat) = self.store.add_admin(&thread_id, &user_id).await {
            self.events.publish(ClientEvent::ChatAdminAdd { chat, user });
        }
        Ok(())
    }

    async fn admin_remove(&self, op: &RealtimeOp) -> Result<(), ClientError> {
        let (thread_id, user_id) = paths::extract_admin_path(&op.path)?;
        self.ensure_chat(&thread_id).await?;
        let user = self.resolve_user(&user_id).await?;
        if let Some(chat) = self.store.remove_admin(&thread_id, &user_id).await {
            self.events.publish(ClientEvent::ChatAdminRemove { chat, user });
        }
        Ok(())
    }

    /// Removal announcement. The cached message stays; the event carries
    /// its last known state. Nothing is announced for an unknown item.
    async fn message_remove(&self, op: &RealtimeOp) -> Result<(), ClientError> {
        let thread_id = paths::extract_thread_from_item_path(&op.path)?;
        let item_id = op
            .value
            .as_deref()
            .ok_or_else(|| ClientError::Parse(format!("remove without value {}", op.path)))?;
        self.ensure_chat(&thread_id).await?;
        match self.store.find_message(&thread_id, item_id).await {
            Some(message) => self.events.publish(ClientEvent::MessageDelete(message)),
            None => trace!(item_id, "remove for uncached item"),
        }
        Ok(())
    }

    /// Returns the cached chat or fetches and seeds it. The seed merge
    /// never announces events.
    async fn ensure_chat(&self, thread_id: &str) -> Result<Chat, ClientError> {
        if let Some(chat) = self.store.chat(thread_id).await {
            return Ok(chat);
        }
        let payload = self
            .remote
            .fetch_thread(thread_id)
            .await
            .map_err(|err| ClientError::UnresolvedReference(format!("thread {thread_id}: {err}")))?;
        let (chat, _) = self.store.merge_thread(&payload, &self.rules).await;
        Ok(chat)
    }

    async fn resolve_user(&self, user_id: &str) -> Result<User, ClientError> {
        if let Some(user) = self.store.user(user_id).await {
            return Ok(user);
        }
        let pk: u64 = user_id
            .parse()
            .map_err(|_| ClientError::Parse(format!("user id {user_id}")))?;
        let payload = self
            .remote
            .fetch_user(pk)
            .await
            .map_err(|err| ClientError::UnresolvedReference(format!("user {user_id}: {err}")))?;
        Ok(self.store.get_or_create_user(&payload).await)
    }
}

fn decode_item(op: &RealtimeOp) -> Result<ThreadItemPayload, ClientError> {
    let value = op
        .value
        .as_deref()
        .ok_or_else(|| ClientError::Parse(format!("op without value {}", op.path)))?;
    serde_json::from_str(value).map_err(|err| ClientError::Parse(format!("item value: {err}")))
}

fn decode_thread(op: &RealtimeOp) -> Result<ThreadPayload, ClientError> {
    let value = op
        .value
        .as_deref()
        .ok_or_else(|| ClientError::Parse(format!("op without value {}", op.path)))?;
    serde_json::from_str(value).map_err(|err| ClientError::Parse(format!("thread value: {err}")))
}
