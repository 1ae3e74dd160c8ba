//! Durable, cached store of conversation sessions.
//!
//! The in-memory cache is the authoritative read path; the backend is a best-effort
//! durability backstop. Reads never fail, and write failures are reported beside the
//! updated session instead of being raised.

mod backend;
mod backends;
mod error;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatMessage, FilesystemSessionBackend, InMemorySessionBackend, MemoryError,
        MemoryErrorKind, Session, SessionBackend, SessionBackendConfig, SessionStore,
        SessionSummary, StoreWrite, ThinkingLevel, create_session_backend,
    };
}

pub use backend::{
    FilesystemSessionBackend, InMemorySessionBackend, SessionBackend, SessionBackendConfig,
    create_session_backend,
};
pub use error::{MemoryError, MemoryErrorKind};
pub use store::{SessionStore, StoreWrite};
pub use types::{ChatMessage, PREVIEW_CHARS, Session, SessionSummary, ThinkingLevel};
