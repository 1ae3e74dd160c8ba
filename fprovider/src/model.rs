//! Provider-agnostic request, result, and message model types.
//!
//! ```rust
//! use fprovider::{Message, ProviderId, Role};
//!
//! let message = Message::new(Role::User, "Summarize this thread");
//! assert_eq!(message.role.as_str(), "user");
//! assert_eq!(ProviderId::parse("OpenAI"), Some(ProviderId::OpenAi));
//! ```

use std::fmt::{Display, Formatter};

use crate::ProviderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Anthropic,
    OpenAi,
    OpenRouter,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [Self::Anthropic, Self::OpenAi, Self::OpenRouter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Case-insensitive lookup by the identifier returned from [`ProviderId::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(value))
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The HTTP dialect a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `POST /v1/messages` with `content_block_delta` style events.
    Messages,
    /// `POST /v1/chat/completions` with `choices[0].delta` style events.
    ChatCompletions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub system_prompt: String,
    pub config: ProviderConfig,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, config: ProviderConfig) -> Self {
        let system_prompt = config.system_prompt.clone();
        Self {
            messages,
            system_prompt,
            config,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// History as it goes on the wire: user/assistant turns with non-blank content.
    pub(crate) fn conversation(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|message| message.role != Role::System && !message.content.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionResult {
    pub text: String,
    pub stop_reason: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_parse_case_insensitively() {
        assert_eq!(ProviderId::parse("anthropic"), Some(ProviderId::Anthropic));
        assert_eq!(ProviderId::parse(" OpenRouter "), Some(ProviderId::OpenRouter));
        assert_eq!(ProviderId::parse("gemini"), None);
    }

    #[test]
    fn conversation_skips_system_and_blank_messages() {
        let request = CompletionRequest::new(
            vec![
                Message::new(Role::System, "ignored"),
                Message::new(Role::User, "hi"),
                Message::new(Role::Assistant, "  "),
                Message::new(Role::Assistant, "hello"),
            ],
            ProviderConfig::default(),
        );

        let kept = request.conversation().cloned().collect::<Vec<_>>();
        assert_eq!(
            kept,
            vec![
                Message::new(Role::User, "hi"),
                Message::new(Role::Assistant, "hello"),
            ]
        );
    }
}
