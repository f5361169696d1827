use crate::config::StoryShareRules;
use banter_api::types::{RawItemType, ThreadItemPayload};
use serde_json::{json, Value};

/// Normalized item kinds. Wire types that only differ in media framing
/// collapse into one kind here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Media,
    Voice,
    StoryShare,
    Like,
    ActionLog,
    VideoCallEvent,
}

impl MessageKind {
    pub fn from_raw(raw: &RawItemType) -> Option<Self> {
        match raw {
            RawItemType::Text | RawItemType::Link => Some(Self::Text),
            RawItemType::Media | RawItemType::AnimatedMedia | RawItemType::MediaShare => {
                Some(Self::Media)
            }
            RawItemType::VoiceMedia => Some(Self::Voice),
            RawItemType::StoryShare => Some(Self::StoryShare),
            RawItemType::Like => Some(Self::Like),
            RawItemType::ActionLog => Some(Self::ActionLog),
            RawItemType::VideoCallEvent => Some(Self::VideoCallEvent),
            RawItemType::Unknown => None,
        }
    }

    /// Items the platform injects for thread bookkeeping. They are kept in
    /// fetched history but never announced as new messages.
    pub fn is_bookkeeping(&self) -> bool {
        matches!(self, Self::ActionLog | Self::VideoCallEvent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Media => "media",
            Self::Voice => "voice",
            Self::StoryShare => "story_share",
            Self::Like => "like",
            Self::ActionLog => "action_log",
            Self::VideoCallEvent => "video_call_event",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageLike {
    pub user_id: String,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaData {
    pub url: Option<String>,
    pub is_animated: bool,
    pub is_sticker: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceData {
    pub source_url: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Reshared story. Both fields stay empty when the platform replaced the
/// story with an unavailability notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoryShareData {
    pub author_id: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub author_id: String,
    pub kind: MessageKind,
    /// Platform clock, microseconds.
    pub timestamp: u64,
    pub content: Option<String>,
    pub media: Option<MediaData>,
    pub voice: Option<VoiceData>,
    pub story_share: Option<StoryShareData>,
    pub likes: Vec<MessageLike>,
}

impl Message {
    /// Returns `None` when the payload carries an item type this session
    /// does not model.
    pub fn from_payload(
        chat_id: &str,
        payload: &ThreadItemPayload,
        rules: &StoryShareRules,
    ) -> Option<Self> {
        let kind = MessageKind::from_raw(&payload.item_type)?;
        let mut message = Self {
            id: payload.item_id.clone(),
            chat_id: chat_id.to_string(),
            author_id: payload.user_id.to_string(),
            kind,
            timestamp: payload.timestamp,
            content: None,
            media: None,
            voice: None,
            story_share: None,
            likes: Vec::new(),
        };
        message.patch(payload, rules);
        Some(message)
    }

    /// Applies a partial payload. Absent fields keep their current value;
    /// a present `reactions` block replaces the like list wholesale.
    pub fn patch(&mut self, payload: &ThreadItemPayload, rules: &StoryShareRules) {
        if let Some(kind) = MessageKind::from_raw(&payload.item_type) {
            self.kind = kind;
        }
        self.timestamp = payload.timestamp;
        if let Some(text) = &payload.text {
            self.content = Some(text.clone());
        }
        if let Some(link) = &payload.link {
            if let Some(text) = &link.text {
                self.content = Some(text.clone());
            }
        }
        if let Some(like) = &payload.like {
            self.content = Some(like.clone());
        }
        if let Some(media) = &payload.media {
            self.media = Some(MediaData {
                url: media
                    .image_versions2
                    .as_ref()
                    .and_then(|v| v.candidates.first())
                    .map(|c| c.url.clone()),
                is_animated: false,
                is_sticker: false,
            });
        }
        if let Some(animated) = &payload.animated_media {
            self.media = Some(MediaData {
                url: animated
                    .images
                    .as_ref()
                    .and_then(|i| i.fixed_height.as_ref())
                    .and_then(|f| f.url.clone()),
                is_animated: true,
                is_sticker: animated.is_sticker.unwrap_or(false),
            });
        }
        if let Some(voice) = &payload.voice_media {
            let audio = voice.media.as_ref().and_then(|m| m.audio.as_ref());
            self.voice = Some(VoiceData {
                source_url: audio.and_then(|a| a.audio_src.clone()),
                duration_ms: audio.and_then(|a| a.duration),
            });
        }
        if let Some(share) = &payload.story_share {
            let unavailable = share
                .message
                .as_deref()
                .map(|m| rules.is_unavailable(m))
                .unwrap_or(false);
            if unavailable || share.media.is_none() {
                self.story_share = Some(StoryShareData {
                    author_id: None,
                    source_url: None,
                });
            } else if let Some(media) = &share.media {
                self.story_share = Some(StoryShareData {
                    author_id: media.user.as_ref().map(|u| u.pk.to_string()),
                    source_url: media
                        .image_versions2
                        .as_ref()
                        .and_then(|v| v.candidates.first())
                        .map(|c| c.url.clone()),
                });
            }
        }
        if let Some(reactions) = &payload.reactions {
            self.likes = reactions
                .likes
                .iter()
                .map(|l| MessageLike {
                    user_id: l.sender_id.to_string(),
                    timestamp: l.timestamp,
                })
                .collect();
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "chatID": self.chat_id,
            "authorID": self.author_id,
            "type": self.kind.as_str(),
            "timestamp": self.timestamp,
            "content": self.content,
            "likes": self
                .likes
                .iter()
                .map(|l| json!({"userID": l.user_id, "timestamp": l.timestamp}))
                .collect::<Vec<_>>(),
            "mediaData": self.media.as_ref().map(|m| json!({
                "url": m.url,
                "isAnimated": m.is_animated,
                "isSticker": m.is_sticker,
            })),
            "voiceData": self.voice.as_ref().map(|v| json!({
                "sourceURL": v.source_url,
                "duration": v.duration_ms,
            })),
            "storyShareData": self.story_share.as_ref().map(|s| json!({
                "authorID": s.author_id,
                "sourceURL": s.source_url,
            })),
        })
    }
}
