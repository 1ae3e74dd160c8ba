//! Common imports for most fagent hosts.

pub use crate::{build_controller, build_controller_with, completion_service, init_tracing};
pub use crate::{
    Attachment, ChatController, ChatError, ChatErrorKind, ChatMessage, ChatState, ConfigStore,
    ControllerPolicy, InMemoryConfigStore, ProviderConfig, ProviderId, Role, RunId, RunStatus,
    SessionKey, SessionStore, SessionSummary, ThinkingLevel,
};
