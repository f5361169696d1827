use banter_api::types::UserPayload;
use serde_json::{json, Value};

/// A platform account as seen by the session. Constructed from the first
/// payload that mentions the account; later payloads only overwrite the
/// fields they carry.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_private: bool,
    pub is_verified: bool,
    pub is_business: bool,
    pub avatar_url: Option<String>,
    pub biography: Option<String>,
    pub follower_count: Option<u64>,
    pub following_count: Option<u64>,
    pub media_count: Option<u64>,
    pub total_igtv_videos: Option<u64>,
}

impl User {
    pub fn new(payload: &UserPayload) -> Self {
        let mut user = Self {
            id: payload.pk.to_string(),
            username: String::new(),
            full_name: None,
            is_private: false,
            is_verified: false,
            is_business: false,
            avatar_url: None,
            biography: None,
            follower_count: None,
            following_count: None,
            media_count: None,
            total_igtv_videos: None,
        };
        user.patch(payload);
        user
    }

    /// Applies a partial payload. Absent fields keep their current value.
    pub fn patch(&mut self, payload: &UserPayload) {
        if let Some(username) = &payload.username {
            self.username = username.clone();
        }
        if let Some(full_name) = &payload.full_name {
            self.full_name = Some(full_name.clone());
        }
        if let Some(is_private) = payload.is_private {
            self.is_private = is_private;
        }
        if let Some(is_verified) = payload.is_verified {
            self.is_verified = is_verified;
        }
        if let Some(is_business) = payload.is_business {
            self.is_business = is_business;
        }
        if let Some(url) = &payload.profile_pic_url {
            self.avatar_url = Some(url.clone());
        }
        if let Some(biography) = &payload.biography {
            self.biography = Some(biography.clone());
        }
        if let Some(count) = payload.follower_count {
            self.follower_count = Some(count);
        }
        if let Some(count) = payload.following_count {
            self.following_count = Some(count);
        }
        if let Some(count) = payload.media_count {
            self.media_count = Some(count);
        }
        if let Some(count) = payload.total_igtv_videos {
            self.total_igtv_videos = Some(count);
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "fullName": self.full_name,
            "isPrivate": self.is_private,
            "isVerified": self.is_verified,
            "isBusiness": self.is_business,
            "avatarURL": self.avatar_url,
            "biography": self.biography,
            "followerCount": self.follower_count,
            "followingCount": self.following_count,
            "mediaCount": self.media_count,
            "totalIGTVVideos": self.total_igtv_videos,
        })
    }
}

/// The logged-in account. Carries fields the platform only reports about
/// the viewer itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientUser {
    pub user: User,
    pub allow_contacts_sync: Option<bool>,
    pub phone_number: Option<String>,
}

impl ClientUser {
    pub fn new(payload: &UserPayload) -> Self {
        Self {
            user: User::new(payload),
            allow_contacts_sync: payload.allow_contacts_sync,
            phone_number: payload.phone_number.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut value = self.user.to_json();
        value["allowContactsSync"] = json!(self.allow_contacts_sync);
        value["phoneNumber"] = json!(self.phone_number);
        value
    }
}
