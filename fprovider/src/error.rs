//! Completion error kinds and error value helpers.
//!
//! ```rust
//! use fprovider::{ProviderError, ProviderErrorKind};
//!
//! let missing = ProviderError::credential("no API key configured");
//! assert_eq!(missing.kind, ProviderErrorKind::Credential);
//!
//! let rejected = ProviderError::protocol(401, "{\"error\":\"bad key\"}");
//! assert_eq!(rejected.status, Some(401));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// No usable credential for the selected provider. Raised before any network activity.
    Credential,
    /// Connection-level failure while sending or reading.
    Transport,
    /// Non-success HTTP status. `message` holds the raw response body.
    Protocol,
    /// The response body could not be decoded as a line stream.
    InvalidResponse,
    InvalidRequest,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Credential, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    pub fn protocol(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Protocol,
            message: body.into(),
            status: Some(status),
        }
    }

    /// An error object delivered inside a successful (2xx) event stream.
    pub fn stream_error(kind: &str, message: &str) -> Self {
        let kind = kind.trim();
        let message = if kind.is_empty() {
            message.to_string()
        } else {
            format!("{kind}: {message}")
        };
        Self::new(ProviderErrorKind::Protocol, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Cancelled, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ProviderErrorKind::Cancelled
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} (HTTP {status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}
