use crate::config::StoryShareRules;
use crate::error::ClientError;
use crate::event::{ClientEvent, EventBus};
use crate::remote::RemoteApi;
use crate::store::Store;
use crate::user::User;
use banter_api::types::{
    NotificationPayload, CATEGORY_DIRECT_PENDING, CATEGORY_FOLLOW_REQUEST, CATEGORY_NEW_FOLLOWER,
};
use std::sync::Arc;
use tracing::trace;

/// Turns push notifications into events. A pending-thread notification is
/// announced at most once per thread: known threads are skipped, unknown
/// ones trigger a refetch and are announced only if the refetch confirms
/// them.
#[derive(Clone)]
pub struct PendingTracker {
    store: Store,
    events: EventBus,
    remote: Arc<dyn RemoteApi>,
    rules: StoryShareRules,
}

impl PendingTracker {
    pub fn new(
        store: Store,
        events: EventBus,
        remote: Arc<dyn RemoteApi>,
        rules: StoryShareRules,
    ) -> Self {
        Self {
            store,
            events,
            remote,
            rules,
        }
    }

    pub async fn handle_notification(
        &self,
        notification: NotificationPayload,
    ) -> Result<(), ClientError> {
        match notification.category.as_str() {
            CATEGORY_NEW_FOLLOWER => {
                let user = self.notified_user(&notification).await?;
                self.events.publish(ClientEvent::NewFollower(user));
                Ok(())
            }
            CATEGORY_FOLLOW_REQUEST => {
                let user = self.notified_user(&notification).await?;
                self.events.publish(ClientEvent::FollowRequest(user));
                Ok(())
            }
            CATEGORY_DIRECT_PENDING => self.pending_thread(&notification).await,
            other => {
                trace!(category = other, "ignoring notification category");
                Ok(())
            }
        }
    }

    async fn notified_user(
        &self,
        notification: &NotificationPayload,
    ) -> Result<User, ClientError> {
        let pk = notification.source_user_id.ok_or_else(|| {
            ClientError::Parse("notification without source user".to_string())
        })?;
        if let Some(user) = self.store.user(&pk.to_string()).await {
            return Ok(user);
        }
        let payload = self
            .remote
            .fetch_user(pk)
            .await
            .map_err(|err| ClientError::UnresolvedReference(format!("user {pk}: {err}")))?;
        Ok(self.store.get_or_create_user(&payload).await)
    }

    async fn pending_thread(
        &self,
        notification: &NotificationPayload,
    ) -> Result<(), ClientError> {
        let thread_id = notification.thread_id.as_deref().ok_or_else(|| {
            ClientError::Parse("pending notification without thread".to_string())
        })?;
        if self.store.is_pending(thread_id).await {
            trace!(thread_id, "pending thread already tracked");
            return Ok(());
        }
        let threads = self.remote.fetch_pending_threads().await?;
        self.store.apply_pending_refetch(&threads, &self.rules).await;
        if self.store.is_pending(thread_id).await {
            if let Some(chat) = self.store.chat(thread_id).await {
                self.events.publish(ClientEvent::PendingRequest(chat));
            }
        } else {
            trace!(thread_id, "thread absent from pending refetch");
        }
        Ok(())
    }
}
