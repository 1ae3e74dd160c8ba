//! Chat-layer errors and their visibility policy.

use std::error::Error;
use std::fmt::{Display, Formatter};

use fmemory::MemoryError;
use fprovider::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    Credential,
    Transport,
    Protocol,
    Timeout,
    Cancelled,
    InvalidRequest,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Credential, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Transport, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Protocol, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Cancelled, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Storage, message)
    }

    /// Whether the error belongs in the published error field. Cancellation, storage and
    /// request-shape problems are absorbed.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::Credential
                | ChatErrorKind::Transport
                | ChatErrorKind::Protocol
                | ChatErrorKind::Timeout
        )
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let message = match value.status {
            Some(status) => format!("HTTP {status}: {}", value.message),
            None => value.message,
        };

        match value.kind {
            ProviderErrorKind::Credential => Self::credential(message),
            ProviderErrorKind::Transport => Self::transport(message),
            // An unreadable reply is reported like a protocol failure.
            ProviderErrorKind::Protocol | ProviderErrorKind::InvalidResponse => {
                Self::protocol(message)
            }
            ProviderErrorKind::InvalidRequest => Self::invalid_request(message),
            ProviderErrorKind::Cancelled => Self::cancelled(message),
        }
    }
}

impl From<MemoryError> for ChatError {
    fn from(value: MemoryError) -> Self {
        Self::storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_keep_status_and_map_visibility() {
        let protocol = ChatError::from(ProviderError::protocol(429, "slow down"));
        assert_eq!(protocol.kind, ChatErrorKind::Protocol);
        assert_eq!(protocol.message, "HTTP 429: slow down");
        assert!(protocol.is_user_visible());

        let unreadable = ChatError::from(ProviderError::invalid_response("bad utf-8"));
        assert_eq!(unreadable.kind, ChatErrorKind::Protocol);

        let cancelled = ChatError::from(ProviderError::cancelled("stop"));
        assert!(!cancelled.is_user_visible());
    }

    #[test]
    fn storage_and_request_errors_are_absorbed() {
        assert!(!ChatError::from(MemoryError::storage("disk full")).is_user_visible());
        assert!(!ChatError::invalid_request("empty").is_user_visible());
        assert!(ChatError::timeout("no reply").is_user_visible());
        assert!(ChatError::credential("missing").is_user_visible());
    }
}
