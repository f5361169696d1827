pub mod reconcile_tests;

use crate::config::ClientConfig;
use crate::event::{ClientEvent, EventReceiver};
use crate::push::MockPush;
use crate::realtime::MockRealtime;
use crate::remote::InMemoryRemote;
use crate::time::now_us;
use crate::Client;
use banter_api::types::{
    Credentials, LikePayload, NotificationPayload, RealtimeEnvelope, RealtimeOp, RealtimeOpKind,
    ReactionsPayload, ThreadItemPayload, ThreadPayload, UserPayload, CATEGORY_DIRECT_PENDING,
    CATEGORY_NEW_FOLLOWER,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

pub struct Harness {
    pub client: Client,
    pub remote: InMemoryRemote,
    pub realtime: MockRealtime,
    pub push: MockPush,
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "viewer".to_string(),
        password: "secret".to_string(),
        state: None,
    }
}

pub fn viewer_payload() -> UserPayload {
    user_payload(1, "viewer")
}

pub fn user_payload(pk: u64, username: &str) -> UserPayload {
    let mut payload = UserPayload::bare(pk);
    payload.username = Some(username.to_string());
    payload
}

pub fn thread_with_users(thread_id: &str, users: Vec<UserPayload>) -> ThreadPayload {
    let mut payload = ThreadPayload::bare(thread_id);
    payload.users = Some(users);
    payload
}

pub fn fresh_item(item_id: &str, user_id: u64, body: &str) -> ThreadItemPayload {
    ThreadItemPayload::text(item_id, user_id, now_us(), body)
}

pub fn stale_item(item_id: &str, user_id: u64, body: &str) -> ThreadItemPayload {
    ThreadItemPayload::text(item_id, user_id, now_us().saturating_sub(120_000_000), body)
}

pub fn like(sender_id: u64) -> LikePayload {
    LikePayload {
        sender_id,
        timestamp: now_us(),
    }
}

pub fn reactions(senders: &[u64]) -> ReactionsPayload {
    ReactionsPayload {
        likes: senders.iter().map(|pk| like(*pk)).collect(),
        likes_count: Some(senders.len() as u64),
    }
}

pub fn follower_notification(pk: u64) -> NotificationPayload {
    NotificationPayload {
        category: CATEGORY_NEW_FOLLOWER.to_string(),
        source_user_id: Some(pk),
        thread_id: None,
        message: None,
    }
}

pub fn pending_notification(thread_id: &str) -> NotificationPayload {
    NotificationPayload {
        category: CATEGORY_DIRECT_PENDING.to_string(),
        source_user_id: None,
        thread_id: Some(thread_id.to_string()),
        message: Some("wants to send you a message".to_string()),
    }
}

pub fn envelope(op: RealtimeOpKind, path: &str, value: Option<String>) -> RealtimeEnvelope {
    RealtimeEnvelope {
        data: Some(vec![RealtimeOp {
            op,
            path: path.to_string(),
            value,
        }]),
        mutation_token: None,
    }
}

pub fn encoded<T: Serialize>(value: &T) -> Option<String> {
    Some(serde_json::to_string(value).expect("encode op value"))
}

pub async fn remote_with_viewer() -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    remote.set_viewer(viewer_payload()).await;
    remote
}

pub async fn bootstrapped_client(remote: InMemoryRemote) -> Harness {
    bootstrapped_client_with(ClientConfig::default(), remote).await
}

pub async fn bootstrapped_client_with(config: ClientConfig, remote: InMemoryRemote) -> Harness {
    let realtime = MockRealtime::new();
    let push = MockPush::new();
    let client = Client::login(
        config,
        &credentials(),
        Arc::new(remote.clone()),
        Arc::new(realtime.clone()),
        Arc::new(push.clone()),
    )
    .await
    .expect("login");
    Harness {
        client,
        remote,
        realtime,
        push,
    }
}

pub async fn live_client(remote: InMemoryRemote) -> Harness {
    let harness = bootstrapped_client(remote).await;
    harness.client.connect().await.expect("connect");
    harness
}

pub async fn live_client_with(config: ClientConfig, remote: InMemoryRemote) -> Harness {
    let harness = bootstrapped_client_with(config, remote).await;
    harness.client.connect().await.expect("connect");
    harness
}

pub async fn next_event(rx: &mut EventReceiver) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel")
}

pub async fn assert_no_event(rx: &mut EventReceiver) {
    settle().await;
    match rx.try_recv() {
        Err(TryRecvError::Empty) => {}
        other => panic!("expected no event, got {other:?}"),
    }
}

/// Lets spawned ingest tasks finish applying whatever was emitted.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
