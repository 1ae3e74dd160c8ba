//! Controller-facing values: published state, run records, attachments and policy.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use fcommon::{RunId, SessionKey};
use fmemory::{ChatMessage, SessionSummary, ThinkingLevel};

use crate::ChatError;

/// A file the user attached to a message. Only its presence and name matter to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Pending,
    Completed,
    Errored,
    TimedOut,
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::TimedOut => "timed_out",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory bookkeeping for one send. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run_id: RunId,
    pub session_key: SessionKey,
    pub status: RunStatus,
}

/// Snapshot published to observers after every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatState {
    pub session_key: SessionKey,
    pub transcript: Vec<ChatMessage>,
    pub thinking_level: ThinkingLevel,
    /// Most recently updated first, bounded by [`ControllerPolicy::session_list_limit`].
    pub sessions: Vec<SessionSummary>,
    pub error: Option<String>,
    /// A credential is configured for the selected provider; no network request is made.
    pub provider_reachable: bool,
    pub streaming_text: Option<String>,
    pub pending_runs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerPolicy {
    pub run_timeout: Duration,
    pub session_list_limit: usize,
    pub attachment_placeholder: String,
    pub finished_run_history: usize,
}

impl Default for ControllerPolicy {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(120),
            session_list_limit: 50,
            attachment_placeholder: "See attached.".to_string(),
            finished_run_history: 64,
        }
    }
}

impl ControllerPolicy {
    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_session_list_limit(mut self, limit: usize) -> Self {
        self.session_list_limit = limit;
        self
    }

    pub fn with_attachment_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.attachment_placeholder = placeholder.into();
        self
    }

    pub fn with_finished_run_history(mut self, history: usize) -> Self {
        self.finished_run_history = history;
        self
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.run_timeout.is_zero() {
            return Err(ChatError::invalid_request("run_timeout must be non-zero"));
        }
        if self.attachment_placeholder.trim().is_empty() {
            return Err(ChatError::invalid_request(
                "attachment_placeholder must not be blank",
            ));
        }
        Ok(())
    }

    pub(crate) fn timeout_message(&self) -> String {
        format!(
            "No reply from the assistant within {} seconds.",
            self.run_timeout.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_budgets() {
        let policy = ControllerPolicy::default();
        assert_eq!(policy.run_timeout, Duration::from_secs(120));
        assert_eq!(policy.session_list_limit, 50);
        assert_eq!(policy.attachment_placeholder, "See attached.");
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let error = ControllerPolicy::default()
            .with_run_timeout(Duration::ZERO)
            .validate()
            .expect_err("zero timeout should be invalid");
        assert_eq!(error.kind, crate::ChatErrorKind::InvalidRequest);
    }

    #[test]
    fn timeout_message_names_the_budget() {
        assert_eq!(
            ControllerPolicy::default().timeout_message(),
            "No reply from the assistant within 120 seconds."
        );
    }

    #[test]
    fn only_pending_is_not_terminal() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(RunStatus::Aborted.is_terminal());
        assert_eq!(RunStatus::TimedOut.to_string(), "timed_out");
    }
}
