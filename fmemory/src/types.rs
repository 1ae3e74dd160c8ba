//! Session data held by the store.

use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fcommon::SessionKey;
use fprovider::{Message, Role};
use uuid::Uuid;

/// Characters kept from the last message when building a [`SessionSummary`].
pub const PREVIEW_CHARS: usize = 80;

/// Coarse per-session reasoning hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThinkingLevel {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

impl ThinkingLevel {
    pub const ALL: [ThinkingLevel; 4] = [
        ThinkingLevel::Off,
        ThinkingLevel::Low,
        ThinkingLevel::Medium,
        ThinkingLevel::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Case-insensitive; anything unrecognized is `Off`.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Off,
        }
    }
}

impl Display for ThinkingLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: SystemTime,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = truncate_to_millis(timestamp);
        self
    }

    pub fn to_provider_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

/// One conversation. Created lazily on first access and never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: SessionKey,
    pub display_name: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub thinking_level: ThinkingLevel,
    pub updated_at: SystemTime,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            display_name: None,
            messages: Vec::new(),
            thinking_level: ThinkingLevel::Off,
            updated_at: now(),
        }
    }

    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.key.as_str())
    }

    /// Messages in the shape the completion service consumes.
    pub fn transcript(&self) -> Vec<Message> {
        self.messages
            .iter()
            .map(ChatMessage::to_provider_message)
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            key: self.key.clone(),
            display_name: self.display_name.clone(),
            message_count: self.messages.len(),
            last_message_preview: self
                .messages
                .last()
                .map(|message| preview(&message.content)),
            updated_at: self.updated_at,
        }
    }

    /// Moves `updated_at` forward to now, never backwards.
    pub(crate) fn touch(&mut self) {
        self.updated_at = self.updated_at.max(now());
    }
}

/// Listing entry published to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub display_name: Option<String>,
    pub message_count: usize,
    pub last_message_preview: Option<String>,
    pub updated_at: SystemTime,
}

fn preview(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_CHARS {
        return collapsed;
    }

    let mut clipped: String = collapsed.chars().take(PREVIEW_CHARS).collect();
    clipped.push('…');
    clipped
}

// Persisted timestamps have millisecond resolution, so in-memory ones do too.
pub(crate) fn now() -> SystemTime {
    truncate_to_millis(SystemTime::now())
}

pub(crate) fn truncate_to_millis(value: SystemTime) -> SystemTime {
    from_millis(to_millis(value))
}

pub(crate) fn to_millis(value: SystemTime) -> u64 {
    value
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub(crate) fn from_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}
