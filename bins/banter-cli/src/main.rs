use banter_api::types::{
    Credentials, NotificationPayload, RealtimeEnvelope, RealtimeOp, RealtimeOpKind,
    ThreadItemPayload, ThreadPayload, UserPayload, CATEGORY_NEW_FOLLOWER,
};
use banter_core::config::ClientConfig;
use banter_core::event::ClientEvent;
use banter_core::push::MockPush;
use banter_core::realtime::{MockRealtime, MESSAGE_SYNC_TOPIC};
use banter_core::remote::InMemoryRemote;
use banter_core::time::now_us;
use banter_core::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEMO_THREAD: &str = "100";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("login");

    let remote = InMemoryRemote::new();
    seed_demo(&remote).await;
    let realtime = MockRealtime::new();
    let push = MockPush::new();
    let credentials = Credentials {
        username: "demo".to_string(),
        password: "demo-pass".to_string(),
        state: None,
    };
    let client = Client::login(
        ClientConfig::default(),
        &credentials,
        Arc::new(remote.clone()),
        Arc::new(realtime.clone()),
        Arc::new(push.clone()),
    )
    .await
    .expect("cli login");

    match command {
        "login" => {
            client.connect().await.expect("connect");
            let viewer = client.viewer().await;
            println!("logged in as {} ({})", viewer.user.username, viewer.user.id);
            println!("{}", client.to_json().await);
        }
        "send-text" => {
            if args.len() < 3 {
                eprintln!("usage: banter-cli send-text <text>");
                return;
            }
            let text = args[2..].join(" ");
            client.connect().await.expect("connect");
            echo_next_send(&realtime, &text);
            match client.send_text(DEMO_THREAD, &text).await {
                Ok(message) => println!("sent {} at {}", message.id, message.timestamp),
                Err(err) => eprintln!("error {err}"),
            }
        }
        "events" => {
            let mut rx = client.subscribe();
            client.connect().await.expect("connect");
            run_script(&realtime, &push);
            loop {
                match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                    Ok(Ok(event)) => println!("{}", describe(&event)),
                    Ok(Err(_)) | Err(_) => break,
                }
            }
            client.logout().await;
        }
        _ => {
            eprintln!("unknown command; try login, send-text or events");
        }
    }
}

/// Registers the demo account and one chat with a peer on the scripted
/// remote.
async fn seed_demo(remote: &InMemoryRemote) {
    let mut viewer = UserPayload::bare(1);
    viewer.username = Some("demo".to_string());
    remote.set_viewer(viewer).await;

    let mut peer = UserPayload::bare(2);
    peer.username = Some("ada".to_string());
    peer.full_name = Some("Ada".to_string());
    remote.put_user(peer.clone()).await;

    let mut follower = UserPayload::bare(3);
    follower.username = Some("nia".to_string());
    remote.put_user(follower).await;

    let mut thread = ThreadPayload::bare(DEMO_THREAD);
    thread.thread_title = Some("demo chat".to_string());
    thread.users = Some(vec![UserPayload::bare(1), peer]);
    remote.push_inbox_thread(thread).await;
}

fn add_op(item: &ThreadItemPayload) -> RealtimeEnvelope {
    RealtimeEnvelope {
        data: Some(vec![RealtimeOp {
            op: RealtimeOpKind::Add,
            path: format!("/direct_v2/threads/{DEMO_THREAD}/items/{}", item.item_id),
            value: serde_json::to_string(item).ok(),
        }]),
        mutation_token: None,
    }
}

/// The scripted platform echoes the first acknowledged send back on the
/// realtime channel, the way the real one does.
fn echo_next_send(realtime: &MockRealtime, text: &str) {
    let realtime = realtime.clone();
    let item = ThreadItemPayload::text("8000001", 1, now_us(), text);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        realtime
            .emit_ops(MESSAGE_SYNC_TOPIC, vec![add_op(&item)])
            .await;
    });
}

/// Feeds a canned conversation through the mock channels.
fn run_script(realtime: &MockRealtime, push: &MockPush) {
    let realtime = realtime.clone();
    let push = push.clone();
    tokio::spawn(async move {
        let step = Duration::from_millis(100);

        tokio::time::sleep(step).await;
        let hello = ThreadItemPayload::text("510", 2, now_us(), "hey, you around?");
        realtime
            .emit_ops(MESSAGE_SYNC_TOPIC, vec![add_op(&hello)])
            .await;

        tokio::time::sleep(step).await;
        let mut renamed = ThreadPayload::bare(DEMO_THREAD);
        renamed.thread_title = Some("weekend plans".to_string());
        renamed.video_call_id = Some(Some("17800000".to_string()));
        realtime
            .emit_ops(
                MESSAGE_SYNC_TOPIC,
                vec![RealtimeEnvelope {
                    data: Some(vec![RealtimeOp {
                        op: RealtimeOpKind::Replace,
                        path: format!("/direct_v2/inbox/threads/{DEMO_THREAD}"),
                        value: serde_json::to_string(&renamed).ok(),
                    }]),
                    mutation_token: None,
                }],
            )
            .await;

        tokio::time::sleep(step).await;
        push.emit(NotificationPayload {
            category: CATEGORY_NEW_FOLLOWER.to_string(),
            source_user_id: Some(3),
            thread_id: None,
            message: None,
        })
        .await;
    });
}

fn describe(event: &ClientEvent) -> String {
    match event {
        ClientEvent::Connected => "connected".to_string(),
        ClientEvent::Disconnected { reason } => format!("disconnected: {reason}"),
        ClientEvent::MessageCreate(message) => format!(
            "message {} from {}: {}",
            message.id,
            message.author_id,
            message.content.as_deref().unwrap_or("<media>")
        ),
        ClientEvent::MessageDelete(message) => format!("message {} deleted", message.id),
        ClientEvent::LikeAdd { user, message } => {
            format!("{} liked {}", user.id, message.id)
        }
        ClientEvent::LikeRemove { user, message } => {
            format!("{} unliked {}", user.id, message.id)
        }
        ClientEvent::ChatNameUpdate { chat, new_name, .. } => format!(
            "chat {} renamed to {}",
            chat.id,
            new_name.as_deref().unwrap_or("<unnamed>")
        ),
        ClientEvent::ChatUserAdd { chat, user } => format!("{} joined {}", user.id, chat.id),
        ClientEvent::ChatUserRemove { chat, user } => format!("{} left {}", user.id, chat.id),
        ClientEvent::ChatAdminAdd { chat, user } => format!("{} now admin in {}", user.id, chat.id),
        ClientEvent::ChatAdminRemove { chat, user } => {
            format!("{} no longer admin in {}", user.id, chat.id)
        }
        ClientEvent::CallStart(chat) => format!("call started in {}", chat.id),
        ClientEvent::CallEnd(chat) => format!("call ended in {}", chat.id),
        ClientEvent::NewFollower(user) => format!("new follower {}", user_label(user)),
        ClientEvent::FollowRequest(user) => {
            format!("follow request from {}", user_label(user))
        }
        ClientEvent::PendingRequest(chat) => format!("pending chat {}", chat.id),
    }
}

fn user_label(user: &banter_core::user::User) -> &str {
    if user.username.is_empty() {
        &user.id
    } else {
        &user.username
    }
}
