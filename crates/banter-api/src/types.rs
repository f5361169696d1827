use serde::{Deserialize, Deserializer, Serialize};

/// Opaque session blob produced at login, replayable on the next login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionState {
    pub value: Vec<u8>,
}

impl SessionState {
    pub fn new(value: Vec<u8>) -> Self {
        Self { value }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub state: Option<SessionState>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionContext {
    pub viewer: UserPayload,
    pub state: SessionState,
}

/// Profile payload as the platform sends it. Thread member entries carry a
/// subset of these fields; a full profile fetch carries most of them. Absent
/// fields mean "no change" when layered onto a cached user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub pk: u64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub is_private: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_business: Option<bool>,
    pub profile_pic_url: Option<String>,
    pub biography: Option<String>,
    pub follower_count: Option<u64>,
    pub following_count: Option<u64>,
    pub media_count: Option<u64>,
    pub total_igtv_videos: Option<u64>,
    pub allow_contacts_sync: Option<bool>,
    pub phone_number: Option<String>,
}

impl UserPayload {
    pub fn bare(pk: u64) -> Self {
        Self {
            pk,
            username: None,
            full_name: None,
            is_private: None,
            is_verified: None,
            is_business: None,
            profile_pic_url: None,
            biography: None,
            follower_count: None,
            following_count: None,
            media_count: None,
            total_igtv_videos: None,
            allow_contacts_sync: None,
            phone_number: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPayload {
    pub thread_id: String,
    pub thread_title: Option<String>,
    pub thread_type: Option<String>,
    pub named: Option<bool>,
    pub muted: Option<bool>,
    pub is_pin: Option<bool>,
    pub pending: Option<bool>,
    pub is_group: Option<bool>,
    /// Outer `None` means the field was absent (no change); `Some(None)` is an
    /// explicit null (no call in progress).
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_call_id: Option<Option<String>>,
    pub last_activity_at: Option<u64>,
    pub users: Option<Vec<UserPayload>>,
    pub left_users: Option<Vec<UserPayload>>,
    pub admin_user_ids: Option<Vec<u64>>,
    pub items: Option<Vec<ThreadItemPayload>>,
}

impl ThreadPayload {
    pub fn bare(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            thread_title: None,
            thread_type: None,
            named: None,
            muted: None,
            is_pin: None,
            pending: None,
            is_group: None,
            video_call_id: None,
            last_activity_at: None,
            users: None,
            left_users: None,
            admin_user_ids: None,
            items: None,
        }
    }
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Raw item type vocabulary from the wire. The in-memory model collapses this
/// into a smaller closed set; unrecognized values decode as `Unknown` rather
/// than failing the whole envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawItemType {
    Text,
    Link,
    Media,
    AnimatedMedia,
    MediaShare,
    VoiceMedia,
    StoryShare,
    Like,
    ActionLog,
    VideoCallEvent,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadItemPayload {
    pub item_id: String,
    pub user_id: u64,
    /// Epoch microseconds.
    pub timestamp: u64,
    pub item_type: RawItemType,
    pub text: Option<String>,
    pub like: Option<String>,
    pub link: Option<LinkPayload>,
    pub media: Option<MediaPayload>,
    pub animated_media: Option<AnimatedMediaPayload>,
    pub voice_media: Option<VoiceMediaPayload>,
    pub story_share: Option<StorySharePayload>,
    pub reactions: Option<ReactionsPayload>,
    pub client_context: Option<String>,
}

impl ThreadItemPayload {
    pub fn text(item_id: impl Into<String>, user_id: u64, timestamp: u64, body: &str) -> Self {
        Self {
            item_id: item_id.into(),
            user_id,
            timestamp,
            item_type: RawItemType::Text,
            text: Some(body.to_string()),
            like: None,
            link: None,
            media: None,
            animated_media: None,
            voice_media: None,
            story_share: None,
            reactions: None,
            client_context: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPayload {
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidatePayload {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVersionsPayload {
    #[serde(default)]
    pub candidates: Vec<ImageCandidatePayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub media_type: Option<u32>,
    pub image_versions2: Option<ImageVersionsPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimatedImagePayload {
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimatedImagesPayload {
    pub fixed_height: Option<AnimatedImagePayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimatedMediaPayload {
    pub is_sticker: Option<bool>,
    pub images: Option<AnimatedImagesPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPayload {
    pub audio_src: Option<String>,
    /// Duration in milliseconds.
    pub duration: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMediaInnerPayload {
    pub audio: Option<AudioPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMediaPayload {
    pub media: Option<VoiceMediaInnerPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryMediaPayload {
    pub user: Option<UserPayload>,
    pub image_versions2: Option<ImageVersionsPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySharePayload {
    pub message: Option<String>,
    pub title: Option<String>,
    pub media: Option<StoryMediaPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikePayload {
    pub sender_id: u64,
    /// Epoch microseconds.
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionsPayload {
    #[serde(default)]
    pub likes: Vec<LikePayload>,
    pub likes_count: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeOpKind {
    Add,
    Replace,
    Remove,
    #[serde(other)]
    Other,
}

/// One mutation over a path-addressed resource. For `add` and `replace` the
/// `value` is itself a JSON document encoded as a string; for a message
/// `remove` it is the bare removed item ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeOp {
    pub op: RealtimeOpKind,
    pub path: String,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeEnvelope {
    pub data: Option<Vec<RealtimeOp>>,
    pub mutation_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAck {
    pub item_id: String,
    pub timestamp: Option<u64>,
}

pub const CATEGORY_NEW_FOLLOWER: &str = "new_follower";
pub const CATEGORY_FOLLOW_REQUEST: &str = "private_user_follow_request";
pub const CATEGORY_DIRECT_PENDING: &str = "direct_v2_pending";

/// Out-of-band notification already decoded by the push transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationPayload {
    pub category: String,
    pub source_user_id: Option<u64>,
    pub thread_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum FriendshipAction {
    Follow,
    Unfollow,
    Block,
    Unblock,
    ApproveFollow,
    DenyFollow,
    RemoveFollower,
}

/// Inbox snapshot returned by the bootstrap fetch. The sequence fields are
/// handed to the realtime transport when connecting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxSnapshotPayload {
    #[serde(default)]
    pub threads: Vec<ThreadPayload>,
    pub seq_id: Option<u64>,
    pub snapshot_at_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapSnapshot {
    pub seq_id: Option<u64>,
    pub snapshot_at_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationLimits {
    pub max_text_len: usize,
    pub max_username_len: usize,
    pub max_biography_len: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_text_len: 1000,
            max_username_len: 30,
            max_biography_len: 150,
        }
    }
}
