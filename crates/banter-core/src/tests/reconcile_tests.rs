use super::{
    assert_no_event, encoded, envelope, fresh_item, live_client, next_event, reactions,
    remote_with_viewer, stale_item, thread_with_users, user_payload,
};
use crate::event::ClientEvent;
use crate::reconcile::is_message_valid;
use crate::realtime::MESSAGE_SYNC_TOPIC;
use crate::time::now_us;
use banter_api::types::{RawItemType, RealtimeEnvelope, RealtimeOp, RealtimeOpKind};

#[test]
fn validity_window_tracks_the_item_timestamp() {
    assert!(is_message_valid(now_us()));
    assert!(!is_message_valid(now_us().saturating_sub(60_000_000)));
}

#[tokio::test]
async fn fresh_message_add_announces_create() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&fresh_item("500", 2, "hello there")),
            )],
        )
        .await;

    let event = next_event(&mut rx).await;
    let ClientEvent::MessageCreate(message) = event else {
        panic!("expected MessageCreate, got {event:?}");
    };
    assert_eq!(message.id, "500");
    assert_eq!(message.chat_id, "100");
    assert_eq!(message.author_id, "2");
    assert_eq!(message.content.as_deref(), Some("hello there"));
}

#[tokio::test]
async fn stale_message_add_fills_cache_silently() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&stale_item("500", 2, "old news")),
            )],
        )
        .await;

    assert_no_event(&mut rx).await;
    let chat = harness.client.fetch_chat("100").await.expect("cached chat");
    assert!(chat.message("500").is_some());
}

#[tokio::test]
async fn duplicate_message_add_announces_once() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let op = envelope(
        RealtimeOpKind::Add,
        "/direct_v2/threads/100/items/500",
        encoded(&fresh_item("500", 2, "hello")),
    );
    harness
        .realtime
        .emit_ops(MESSAGE_SYNC_TOPIC, vec![op.clone()])
        .await;
    harness.realtime.emit_ops(MESSAGE_SYNC_TOPIC, vec![op]).await;

    let event = next_event(&mut rx).await;
    assert!(matches!(event, ClientEvent::MessageCreate(_)));
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn bookkeeping_items_are_skipped() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let mut item = fresh_item("500", 2, "");
    item.text = None;
    item.item_type = RawItemType::ActionLog;
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&item),
            )],
        )
        .await;

    assert_no_event(&mut rx).await;
    let chat = harness.client.fetch_chat("100").await.expect("cached chat");
    assert!(chat.message("500").is_none());
}

#[tokio::test]
async fn like_updates_announce_removals_before_additions() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    remote.put_user(user_payload(3, "cy")).await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let item = fresh_item("500", 2, "hello");
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&item),
            )],
        )
        .await;
    next_event(&mut rx).await;

    let mut liked = item.clone();
    liked.reactions = Some(reactions(&[2]));
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/threads/100/items/500",
                encoded(&liked),
            )],
        )
        .await;
    let event = next_event(&mut rx).await;
    let ClientEvent::LikeAdd { user, .. } = event else {
        panic!("expected LikeAdd, got {event:?}");
    };
    assert_eq!(user.id, "2");

    // 2 unlikes while 3 likes: the removal is announced first.
    let mut swapped = item.clone();
    swapped.reactions = Some(reactions(&[3]));
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/threads/100/items/500",
                encoded(&swapped),
            )],
        )
        .await;

    let event = next_event(&mut rx).await;
    let ClientEvent::LikeRemove { user, message } = event else {
        panic!("expected LikeRemove, got {event:?}");
    };
    assert_eq!(user.id, "2");
    assert_eq!(message.likes.len(), 1);

    let event = next_event(&mut rx).await;
    let ClientEvent::LikeAdd { user, .. } = event else {
        panic!("expected LikeAdd, got {event:?}");
    };
    assert_eq!(user.id, "3");
}

#[tokio::test]
async fn overlapping_likers_stay_quiet_across_a_swap() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    remote.put_user(user_payload(3, "cy")).await;
    remote.put_user(user_payload(4, "di")).await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let item = fresh_item("500", 2, "popular");
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&item),
            )],
        )
        .await;
    next_event(&mut rx).await;

    let mut liked = item.clone();
    liked.reactions = Some(reactions(&[2, 3]));
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/threads/100/items/500",
                encoded(&liked),
            )],
        )
        .await;
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    // 2 drops off and 4 joins while 3 stays: one removal, one addition,
    // nothing for the holdover.
    let mut swapped = item.clone();
    swapped.reactions = Some(reactions(&[3, 4]));
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/threads/100/items/500",
                encoded(&swapped),
            )],
        )
        .await;

    let event = next_event(&mut rx).await;
    let ClientEvent::LikeRemove { user, .. } = event else {
        panic!("expected LikeRemove, got {event:?}");
    };
    assert_eq!(user.id, "2");

    let event = next_event(&mut rx).await;
    let ClientEvent::LikeAdd { user, message } = event else {
        panic!("expected LikeAdd, got {event:?}");
    };
    assert_eq!(user.id, "4");
    let likers: Vec<&str> = message.likes.iter().map(|l| l.user_id.as_str()).collect();
    assert_eq!(likers, vec!["3", "4"]);
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn replace_for_unseen_item_fills_cache_quietly() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let mut item = fresh_item("500", 2, "hello");
    item.reactions = Some(reactions(&[2]));
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/threads/100/items/500",
                encoded(&item),
            )],
        )
        .await;

    assert_no_event(&mut rx).await;
    let chat = harness.client.fetch_chat("100").await.expect("cached chat");
    assert!(chat.message("500").is_some());
}

#[tokio::test]
async fn thread_updates_announce_in_fixed_order() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users(
            "100",
            vec![user_payload(2, "bo"), user_payload(3, "cy")],
        ))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let mut update = thread_with_users("100", vec![user_payload(2, "bo"), user_payload(4, "di")]);
    update.thread_title = Some("book club".to_string());
    update.video_call_id = Some(Some("17800000".to_string()));
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/inbox/threads/100",
                encoded(&update),
            )],
        )
        .await;

    let event = next_event(&mut rx).await;
    let ClientEvent::ChatNameUpdate {
        old_name, new_name, ..
    } = event
    else {
        panic!("expected ChatNameUpdate, got {event:?}");
    };
    assert_eq!(old_name, None);
    assert_eq!(new_name.as_deref(), Some("book club"));

    let event = next_event(&mut rx).await;
    let ClientEvent::ChatUserAdd { user, .. } = event else {
        panic!("expected ChatUserAdd, got {event:?}");
    };
    assert_eq!(user.id, "4");

    let event = next_event(&mut rx).await;
    let ClientEvent::ChatUserRemove { user, chat } = event else {
        panic!("expected ChatUserRemove, got {event:?}");
    };
    assert_eq!(user.id, "3");
    assert!(!chat.user_ids.contains(&"3".to_string()));

    let event = next_event(&mut rx).await;
    assert!(matches!(event, ClientEvent::CallStart(_)));
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn admin_revoke_actually_drops_the_admin() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/admin_user_ids/2",
                None,
            )],
        )
        .await;
    let event = next_event(&mut rx).await;
    let ClientEvent::ChatAdminAdd { chat, user } = event else {
        panic!("expected ChatAdminAdd, got {event:?}");
    };
    assert_eq!(user.id, "2");
    assert_eq!(chat.admin_user_ids, vec!["2".to_string()]);

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Remove,
                "/direct_v2/threads/100/admin_user_ids/2",
                None,
            )],
        )
        .await;
    let event = next_event(&mut rx).await;
    let ClientEvent::ChatAdminRemove { chat, user } = event else {
        panic!("expected ChatAdminRemove, got {event:?}");
    };
    assert_eq!(user.id, "2");
    assert!(chat.admin_user_ids.is_empty());
}

#[tokio::test]
async fn message_remove_announces_only_cached_items() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&fresh_item("500", 2, "soon gone")),
            )],
        )
        .await;
    next_event(&mut rx).await;

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Remove,
                "/direct_v2/threads/100/items",
                Some("500".to_string()),
            )],
        )
        .await;
    let event = next_event(&mut rx).await;
    let ClientEvent::MessageDelete(message) = event else {
        panic!("expected MessageDelete, got {event:?}");
    };
    assert_eq!(message.content.as_deref(), Some("soon gone"));

    // The entry stays cached after the announcement.
    let chat = harness.client.fetch_chat("100").await.expect("cached chat");
    assert!(chat.message("500").is_some());

    // A removal for an item never seen announces nothing.
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Remove,
                "/direct_v2/threads/100/items",
                Some("999".to_string()),
            )],
        )
        .await;
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn uncached_thread_reference_is_fetched_and_seeded() {
    let remote = remote_with_viewer().await;
    remote
        .put_thread(thread_with_users("200", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/200/items/500",
                encoded(&fresh_item("500", 2, "first contact")),
            )],
        )
        .await;

    let event = next_event(&mut rx).await;
    let ClientEvent::MessageCreate(message) = event else {
        panic!("expected MessageCreate, got {event:?}");
    };
    assert_eq!(message.chat_id, "200");
    // Seeding the chat announced nothing besides the message itself.
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn failed_op_does_not_poison_the_batch() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    remote.fail_user_fetch(77).await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![RealtimeEnvelope {
                data: Some(vec![
                    RealtimeOp {
                        op: RealtimeOpKind::Add,
                        path: "/direct_v2/threads/100/admin_user_ids/77".to_string(),
                        value: None,
                    },
                    RealtimeOp {
                        op: RealtimeOpKind::Add,
                        path: "/direct_v2/threads/100/items/500".to_string(),
                        value: encoded(&fresh_item("500", 2, "still here")),
                    },
                ]),
                mutation_token: None,
            }],
        )
        .await;

    let event = next_event(&mut rx).await;
    assert!(matches!(event, ClientEvent::MessageCreate(_)));
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn malformed_op_value_is_skipped() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![
                envelope(
                    RealtimeOpKind::Add,
                    "/direct_v2/threads/100/items/499",
                    Some("this is not json".to_string()),
                ),
                envelope(
                    RealtimeOpKind::Add,
                    "/direct_v2/threads/100/items/500",
                    encoded(&fresh_item("500", 2, "decodable")),
                ),
            ],
        )
        .await;

    let event = next_event(&mut rx).await;
    let ClientEvent::MessageCreate(message) = event else {
        panic!("expected MessageCreate, got {event:?}");
    };
    assert_eq!(message.id, "500");
}

#[tokio::test]
async fn off_topic_frames_are_ignored() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            "88",
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&fresh_item("500", 2, "wrong channel")),
            )],
        )
        .await;

    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn replace_on_unrecognized_path_is_quiet() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/unseen_count",
                Some("3".to_string()),
            )],
        )
        .await;

    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn like_state_survives_for_the_delete_announcement() {
    let remote = remote_with_viewer().await;
    remote
        .push_inbox_thread(thread_with_users("100", vec![user_payload(2, "bo")]))
        .await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let mut item = fresh_item("500", 2, "liked then gone");
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Add,
                "/direct_v2/threads/100/items/500",
                encoded(&item),
            )],
        )
        .await;
    next_event(&mut rx).await;

    item.reactions = Some(reactions(&[2]));
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/threads/100/items/500",
                encoded(&item),
            )],
        )
        .await;
    next_event(&mut rx).await;

    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Remove,
                "/direct_v2/threads/100/items",
                Some("500".to_string()),
            )],
        )
        .await;
    let event = next_event(&mut rx).await;
    let ClientEvent::MessageDelete(message) = event else {
        panic!("expected MessageDelete, got {event:?}");
    };
    assert_eq!(message.likes.len(), 1);
    assert_eq!(message.likes[0].user_id, "2");
}

#[tokio::test]
async fn thread_update_for_unknown_chat_seeds_without_events() {
    let remote = remote_with_viewer().await;
    let harness = live_client(remote).await;
    let mut rx = harness.client.subscribe();

    let mut update = thread_with_users("300", vec![user_payload(2, "bo")]);
    update.thread_title = Some("fresh".to_string());
    harness
        .realtime
        .emit_ops(
            MESSAGE_SYNC_TOPIC,
            vec![envelope(
                RealtimeOpKind::Replace,
                "/direct_v2/inbox/threads/300",
                encoded(&update),
            )],
        )
        .await;

    assert_no_event(&mut rx).await;
    let chat = harness.client.fetch_chat("300").await.expect("seeded chat");
    assert_eq!(chat.name.as_deref(), Some("fresh"));
}
