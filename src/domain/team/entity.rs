//! Team entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned team identifier, monotonically increasing and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(i64);

impl TeamId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat-platform resources provisioned for a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBundle {
    pub role_token: String,
    pub category_channel_ref: String,
    pub text_channel_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_channel_ref: Option<String>,
}

impl ChannelBundle {
    pub fn new(
        role_token: impl Into<String>,
        category_channel_ref: impl Into<String>,
        text_channel_ref: impl Into<String>,
    ) -> Self {
        Self {
            role_token: role_token.into(),
            category_channel_ref: category_channel_ref.into(),
            text_channel_ref: text_channel_ref.into(),
            voice_channel_ref: None,
        }
    }

    pub fn with_voice_channel(mut self, voice_channel_ref: impl Into<String>) -> Self {
        self.voice_channel_ref = Some(voice_channel_ref.into());
        self
    }
}

/// Team entity
///
/// Channels are `None` until the chat layer has provisioned them in response
/// to the team-created event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<ChannelBundle>,
    created_at: DateTime<Utc>,
}

impl Team {
    /// Rebuild a team from stored fields; ids are only ever assigned by a store
    pub fn restore(
        id: TeamId,
        name: impl Into<String>,
        channels: Option<ChannelBundle>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            channels,
            created_at,
        }
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> Option<&ChannelBundle> {
        self.channels.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Channel-safe slug, e.g. `7-space-rockets-text`
    pub fn text_channel_name(&self) -> String {
        format!(
            "{}-{}-text",
            self.id,
            self.name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
        )
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_channels(&mut self, channels: ChannelBundle) {
        self.channels = Some(channels);
    }
}
