use crate::chat::Chat;
use crate::message::Message;
use crate::user::User;
use tokio::sync::broadcast;

/// Application-facing events. Each variant carries a snapshot of the entities
/// involved, cloned out of the store at emission time.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    MessageCreate(Message),
    MessageDelete(Message),
    LikeAdd { user: User, message: Message },
    LikeRemove { user: User, message: Message },
    ChatNameUpdate { chat: Chat, old_name: Option<String>, new_name: Option<String> },
    ChatUserAdd { chat: Chat, user: User },
    ChatUserRemove { chat: Chat, user: User },
    ChatAdminAdd { chat: Chat, user: User },
    ChatAdminRemove { chat: Chat, user: User },
    CallStart(Chat),
    CallEnd(Chat),
    NewFollower(User),
    FollowRequest(User),
    PendingRequest(Chat),
    Connected,
    Disconnected { reason: String },
}

pub type EventReceiver = broadcast::Receiver<ClientEvent>;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new(size: usize) -> Self {
        let (tx, _) = broadcast::channel(size);
        Self { tx }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }
}
