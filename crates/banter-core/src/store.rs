//! Identity-mapped entity cache.
//!
//! One record per platform ID. Constructors win on first sight, patches win
//! thereafter. Compound operations hold the store lock for their full
//! duration; appliers never observe a half-applied payload.

use crate::chat::{Chat, ChatPatch};
use crate::config::StoryShareRules;
use crate::message::{Message, MessageLike};
use crate::user::User;
use banter_api::types::{ThreadItemPayload, ThreadPayload, UserPayload};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Changes a thread payload made to an already known chat. At most one
/// member change per direction is reported, the first in payload order.
#[derive(Clone, Debug, Default)]
pub struct ThreadDiff {
    pub name_change: Option<(Option<String>, Option<String>)>,
    pub added_member: Option<String>,
    pub removed_member: Option<String>,
    pub call_started: bool,
    pub call_ended: bool,
}

#[derive(Clone, Debug, Default)]
pub struct LikeDiff {
    pub removed: Vec<MessageLike>,
    pub added: Vec<MessageLike>,
}

#[derive(Clone, Debug, Default)]
pub struct MessageMerge {
    pub message: Option<Message>,
    pub like_diff: Option<LikeDiff>,
    pub created: bool,
}

#[derive(Default)]
struct EntityStore {
    users: HashMap<String, User>,
    chats: HashMap<String, Chat>,
    pending_chat_ids: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<EntityStore>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a full thread payload. Returns the post-merge chat and, for a
    /// chat that already existed, the diff against its previous state.
    pub async fn merge_thread(
        &self,
        payload: &ThreadPayload,
        rules: &StoryShareRules,
    ) -> (Chat, Option<ThreadDiff>) {
        let mut guard = self.inner.lock().await;
        merge_thread_locked(&mut guard, payload, rules)
    }

    /// Merges a single item payload into a cached chat. The caller resolves
    /// the chat first; an unknown chat yields an empty merge.
    pub async fn merge_message(
        &self,
        chat_id: &str,
        payload: &ThreadItemPayload,
        rules: &StoryShareRules,
    ) -> MessageMerge {
        let mut guard = self.inner.lock().await;
        let Some(chat) = guard.chats.get_mut(chat_id) else {
            return MessageMerge::default();
        };
        match chat.messages.iter().position(|m| m.id == payload.item_id) {
            Some(index) => {
                let existing = &mut chat.messages[index];
                let old_likes = existing.likes.clone();
                existing.patch(payload, rules);
                let like_diff = payload.reactions.as_ref().map(|_| LikeDiff {
                    removed: old_likes
                        .iter()
                        .filter(|old| !existing.likes.iter().any(|new| new.user_id == old.user_id))
                        .cloned()
                        .collect(),
                    added: existing
                        .likes
                        .iter()
                        .filter(|new| !old_likes.iter().any(|old| old.user_id == new.user_id))
                        .cloned()
                        .collect(),
                });
                MessageMerge {
                    message: Some(existing.clone()),
                    like_diff,
                    created: false,
                }
            }
            None => match Message::from_payload(chat_id, payload, rules) {
                Some(message) => {
                    chat.messages.push(message.clone());
                    MessageMerge {
                        message: Some(message),
                        like_diff: None,
                        created: true,
                    }
                }
                None => MessageMerge::default(),
            },
        }
    }

    pub async fn find_message(&self, chat_id: &str, item_id: &str) -> Option<Message> {
        let guard = self.inner.lock().await;
        guard.chats.get(chat_id)?.message(item_id).cloned()
    }

    /// Records an admin grant as announced, duplicates included.
    pub async fn add_admin(&self, chat_id: &str, user_id: &str) -> Option<Chat> {
        let mut guard = self.inner.lock().await;
        let chat = guard.chats.get_mut(chat_id)?;
        chat.admin_user_ids.push(user_id.to_string());
        Some(chat.clone())
    }

    pub async fn remove_admin(&self, chat_id: &str, user_id: &str) -> Option<Chat> {
        let mut guard = self.inner.lock().await;
        let chat = guard.chats.get_mut(chat_id)?;
        chat.admin_user_ids.retain(|id| id != user_id);
        Some(chat.clone())
    }

    pub async fn get_or_create_user(&self, payload: &UserPayload) -> User {
        let mut guard = self.inner.lock().await;
        upsert_user(&mut guard.users, payload)
    }

    pub async fn user(&self, id: &str) -> Option<User> {
        self.inner.lock().await.users.get(id).cloned()
    }

    pub async fn chat(&self, id: &str) -> Option<Chat> {
        self.inner.lock().await.chats.get(id).cloned()
    }

    pub async fn has_chat(&self, id: &str) -> bool {
        self.inner.lock().await.chats.contains_key(id)
    }

    pub async fn is_pending(&self, chat_id: &str) -> bool {
        self.inner.lock().await.pending_chat_ids.contains(chat_id)
    }

    /// Replaces the pending-request set with the refetched threads and
    /// merges each of them.
    pub async fn apply_pending_refetch(
        &self,
        threads: &[ThreadPayload],
        rules: &StoryShareRules,
    ) {
        let mut guard = self.inner.lock().await;
        for payload in threads {
            merge_thread_locked(&mut guard, payload, rules);
        }
        guard.pending_chat_ids = threads.iter().map(|t| t.thread_id.clone()).collect();
    }

    /// Clears the pending flag after the viewer accepted the request.
    pub async fn mark_approved(&self, chat_id: &str) -> Option<Chat> {
        let mut guard = self.inner.lock().await;
        guard.pending_chat_ids.remove(chat_id);
        let chat = guard.chats.get_mut(chat_id)?;
        chat.pending = false;
        Some(chat.clone())
    }

    pub async fn set_typing(&self, chat_id: &str, typing: bool) {
        if let Some(chat) = self.inner.lock().await.chats.get_mut(chat_id) {
            chat.typing = typing;
        }
    }

    pub async fn set_user_biography(&self, user_id: &str, biography: &str) {
        if let Some(user) = self.inner.lock().await.users.get_mut(user_id) {
            user.biography = Some(biography.to_string());
        }
    }
}

fn merge_thread_locked(
    state: &mut EntityStore,
    payload: &ThreadPayload,
    rules: &StoryShareRules,
) -> (Chat, Option<ThreadDiff>) {
    if let Some(users) = &payload.users {
        for user in users {
            upsert_user(&mut state.users, user);
        }
    }
    if let Some(users) = &payload.left_users {
        for user in users {
            upsert_user(&mut state.users, user);
        }
    }

    let created = !state.chats.contains_key(&payload.thread_id);
    let chat = state
        .chats
        .entry(payload.thread_id.clone())
        .or_insert_with(|| Chat::new(payload.thread_id.clone()));

    let old_name = chat.name.clone();
    let old_members = chat.user_ids.clone();
    let was_calling = chat.calling;

    chat.patch(&ChatPatch::from_payload(payload));
    if let Some(users) = &payload.users {
        chat.user_ids = users.iter().map(|u| u.pk.to_string()).collect();
    }
    if let Some(users) = &payload.left_users {
        chat.left_user_ids = users.iter().map(|u| u.pk.to_string()).collect();
    }
    if let Some(items) = &payload.items {
        for item in items {
            upsert_item(chat, item, rules);
        }
    }

    if created {
        return (chat.clone(), None);
    }

    let (added_member, removed_member) = if payload.users.is_some() {
        (
            first_missing(&chat.user_ids, &old_members),
            first_missing(&old_members, &chat.user_ids),
        )
    } else {
        (None, None)
    };
    let diff = ThreadDiff {
        name_change: (old_name != chat.name).then(|| (old_name, chat.name.clone())),
        added_member,
        removed_member,
        call_started: !was_calling && chat.calling,
        call_ended: was_calling && !chat.calling,
    };
    (chat.clone(), Some(diff))
}

fn upsert_user(users: &mut HashMap<String, User>, payload: &UserPayload) -> User {
    let id = payload.pk.to_string();
    match users.get_mut(&id) {
        Some(user) => {
            user.patch(payload);
            user.clone()
        }
        None => {
            let user = User::new(payload);
            users.insert(id, user.clone());
            user
        }
    }
}

fn upsert_item(chat: &mut Chat, payload: &ThreadItemPayload, rules: &StoryShareRules) {
    match chat.messages.iter().position(|m| m.id == payload.item_id) {
        Some(index) => chat.messages[index].patch(payload, rules),
        None => {
            let chat_id = chat.id.clone();
            if let Some(message) = Message::from_payload(&chat_id, payload, rules) {
                chat.messages.push(message);
            }
        }
    }
}

fn first_missing(candidates: &[String], reference: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|id| !reference.contains(id))
        .cloned()
}
