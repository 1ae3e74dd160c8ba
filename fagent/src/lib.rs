//! Unified facade over the fagent workspace crates.
//!
//! This crate is the single dependency for most hosts. It re-exports the core crates and
//! wires a production [`ChatController`] from a config store and a sessions directory.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fagent::prelude::*;
//!
//! # async fn run() -> Result<(), ChatError> {
//! fagent::init_tracing("fagent=info,warn");
//!
//! let config = Arc::new(InMemoryConfigStore::new(
//!     ProviderConfig::for_provider(ProviderId::Anthropic).with_credential("sk-ant-..."),
//! ));
//! let controller = build_controller(config, "./sessions")?;
//!
//! let mut state = controller.subscribe();
//! controller.send_message("Summarize this repository.", &[]);
//! let settled = state
//!     .wait_for(|state| state.pending_runs == 0)
//!     .await
//!     .map(|state| state.clone());
//! # let _ = settled;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod prelude;
pub mod runtime;

pub use fchat;
pub use fcommon;
pub use fmemory;
pub use fobserve;
pub use fprovider;

pub use fchat::{
    Attachment, ChatController, ChatControllerBuilder, ChatError, ChatErrorKind,
    ChatRuntimeHooks, ChatState, ControllerPolicy, NoopChatRuntimeHooks, RunRecord, RunStatus,
};
pub use fcommon::{BoxFuture, RunId, SessionKey};
pub use fmemory::{
    ChatMessage, FilesystemSessionBackend, InMemorySessionBackend, MemoryError, MemoryErrorKind,
    Session, SessionBackend, SessionBackendConfig, SessionStore, SessionSummary, StoreWrite,
    ThinkingLevel, create_session_backend,
};
pub use fobserve::{
    MetricsObservabilityHooks, SafeChatHooks, SafeProviderHooks, TracingObservabilityHooks,
};
pub use fprovider::{
    CancellationToken, CompletionProvider, CompletionRequest, CompletionResult,
    CompletionService, ConfigStore, HttpTransport, InMemoryConfigStore, Message,
    NoopOperationHooks, ProviderConfig, ProviderError, ProviderErrorKind, ProviderId,
    ProviderOperationHooks, ReqwestTransport, Role, SecretString, StreamCallback,
};

pub use logging::init_tracing;
pub use runtime::{
    DEFAULT_CONNECT_TIMEOUT, build_controller, build_controller_with, completion_service,
};
