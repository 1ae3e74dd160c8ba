//! Runtime hook contracts for observing run lifecycles.
//!
//! ```rust
//! use fchat::{ChatRuntimeHooks, NoopChatRuntimeHooks};
//!
//! fn accepts_hooks(_hooks: &dyn ChatRuntimeHooks) {}
//!
//! let hooks = NoopChatRuntimeHooks;
//! accepts_hooks(&hooks);
//! ```

use std::time::Duration;

use fcommon::{RunId, SessionKey};
use fmemory::MemoryError;

use crate::{ChatError, RunStatus};

pub trait ChatRuntimeHooks: Send + Sync {
    fn on_run_start(&self, _session_key: &SessionKey, _run_id: &RunId) {}

    /// Called exactly once per run, with the terminal status it settled in.
    fn on_run_finish(
        &self,
        _session_key: &SessionKey,
        _run_id: &RunId,
        _status: RunStatus,
        _error: Option<&ChatError>,
        _elapsed: Duration,
    ) {
    }

    fn on_persistence_failure(
        &self,
        _session_key: &SessionKey,
        _operation: &'static str,
        _error: &MemoryError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatRuntimeHooks;

impl ChatRuntimeHooks for NoopChatRuntimeHooks {}
