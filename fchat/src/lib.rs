//! Chat controller: session lifecycle, run lifecycle and observable state.
//!
//! A [`ChatController`] appends user messages to the active session, launches each
//! completion as a detached task with its own cancellation token and timeout watchdog, and
//! publishes a [`ChatState`] snapshot through a `tokio::sync::watch` channel after every
//! change.

mod controller;
mod error;
mod hooks;
mod runs;
mod types;

pub mod prelude {
    pub use crate::{
        Attachment, ChatController, ChatControllerBuilder, ChatError, ChatErrorKind,
        ChatRuntimeHooks, ChatState, ControllerPolicy, NoopChatRuntimeHooks, RunRecord,
        RunStatus,
    };
    pub use fcommon::{RunId, SessionKey};
}

pub use controller::{ChatController, ChatControllerBuilder};
pub use error::{ChatError, ChatErrorKind};
pub use hooks::{ChatRuntimeHooks, NoopChatRuntimeHooks};
pub use types::{Attachment, ChatState, ControllerPolicy, RunRecord, RunStatus};
