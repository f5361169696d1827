use banter_api::types::ValidationLimits;
use serde::{Deserialize, Serialize};

/// Sentinel strings the platform uses for story shares whose source story can
/// no longer be viewed. The set is not enumerable upstream, so it is kept
/// extensible instead of hardcoded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StoryShareRules {
    pub unavailable_messages: Vec<String>,
    pub hidden_prefixes: Vec<String>,
}

impl Default for StoryShareRules {
    fn default() -> Self {
        Self {
            unavailable_messages: vec!["No longer available".to_string()],
            hidden_prefixes: vec!["This story is no longer available".to_string()],
        }
    }
}

impl StoryShareRules {
    pub fn is_unavailable(&self, message: &str) -> bool {
        self.unavailable_messages.iter().any(|m| m == message)
            || self.hidden_prefixes.iter().any(|p| message.starts_with(p.as_str()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub event_capacity: usize,
    pub typing_keep_alive_ms: u64,
    pub typing_default_duration_ms: u64,
    pub foreground_keep_alive_secs: u64,
    pub story_share: StoryShareRules,
    pub limits: ValidationLimits,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            typing_keep_alive_ms: 9_000,
            typing_default_duration_ms: 10_000,
            foreground_keep_alive_secs: 60,
            story_share: StoryShareRules::default(),
            limits: ValidationLimits::default(),
        }
    }
}
