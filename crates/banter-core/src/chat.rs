use crate::message::Message;
use banter_api::types::ThreadPayload;
use serde_json::{json, Value};

/// A conversation thread. Member and message lists keep platform order;
/// scalar fields follow the last payload that mentioned them.
#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub id: String,
    pub name: Option<String>,
    pub named: bool,
    pub muted: bool,
    pub pinned: bool,
    pub pending: bool,
    pub is_group: bool,
    pub calling: bool,
    pub thread_type: Option<String>,
    pub last_activity_at: Option<u64>,
    pub admin_user_ids: Vec<String>,
    pub user_ids: Vec<String>,
    pub left_user_ids: Vec<String>,
    pub messages: Vec<Message>,
    pub typing: bool,
}

/// Scalar fields a thread payload may carry. Absent fields leave the chat
/// untouched; membership and item lists are merged separately.
#[derive(Clone, Debug, Default)]
pub struct ChatPatch {
    pub name: Option<Option<String>>,
    pub named: Option<bool>,
    pub muted: Option<bool>,
    pub pinned: Option<bool>,
    pub pending: Option<bool>,
    pub is_group: Option<bool>,
    pub calling: Option<bool>,
    pub thread_type: Option<String>,
    pub last_activity_at: Option<u64>,
    pub admin_user_ids: Option<Vec<String>>,
}

impl ChatPatch {
    pub fn from_payload(payload: &ThreadPayload) -> Self {
        Self {
            name: payload.thread_title.clone().map(Some),
            named: payload.named,
            muted: payload.muted,
            pinned: payload.is_pin,
            pending: payload.pending,
            is_group: payload.is_group,
            calling: payload.video_call_id.as_ref().map(|id| id.is_some()),
            thread_type: payload.thread_type.clone(),
            last_activity_at: payload.last_activity_at,
            admin_user_ids: payload
                .admin_user_ids
                .as_ref()
                .map(|ids| ids.iter().map(|id| id.to_string()).collect()),
        }
    }
}

impl Chat {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            named: false,
            muted: false,
            pinned: false,
            pending: false,
            is_group: false,
            calling: false,
            thread_type: None,
            last_activity_at: None,
            admin_user_ids: Vec::new(),
            user_ids: Vec::new(),
            left_user_ids: Vec::new(),
            messages: Vec::new(),
            typing: false,
        }
    }

    pub fn patch(&mut self, patch: &ChatPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(named) = patch.named {
            self.named = named;
        }
        if let Some(muted) = patch.muted {
            self.muted = muted;
        }
        if let Some(pinned) = patch.pinned {
            self.pinned = pinned;
        }
        if let Some(pending) = patch.pending {
            self.pending = pending;
        }
        if let Some(is_group) = patch.is_group {
            self.is_group = is_group;
        }
        if let Some(calling) = patch.calling {
            self.calling = calling;
        }
        if let Some(thread_type) = &patch.thread_type {
            self.thread_type = Some(thread_type.clone());
        }
        if let Some(last_activity_at) = patch.last_activity_at {
            self.last_activity_at = Some(last_activity_at);
        }
        if let Some(admin_user_ids) = &patch.admin_user_ids {
            self.admin_user_ids = admin_user_ids.clone();
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// First message in platform order, the one a freshly accepted request
    /// is announced with.
    pub fn first_message(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "named": self.named,
            "muted": self.muted,
            "pinned": self.pinned,
            "pending": self.pending,
            "isGroup": self.is_group,
            "calling": self.calling,
            "type": self.thread_type,
            "lastActivityAt": self.last_activity_at,
            "adminUserIDs": self.admin_user_ids,
            "users": self.user_ids,
            "leftUsers": self.left_user_ids,
            "messages": self.messages.iter().map(|m| m.id.clone()).collect::<Vec<_>>(),
            "typing": self.typing,
        })
    }
}
