use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use fchat::{ChatError, ChatRuntimeHooks, RunStatus};
use fcommon::{RunId, SessionKey};
use fmemory::MemoryError;
use fprovider::{CompletionResult, ProviderError, ProviderId, ProviderOperationHooks};

/// Absorbs panics raised by the wrapped provider hooks.
pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_request_start(&self, provider: ProviderId, model: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_request_start(provider, model)
        }));
    }

    fn on_success(
        &self,
        provider: ProviderId,
        result: &CompletionResult,
        skipped_events: u32,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_success(provider, result, skipped_events, elapsed)
        }));
    }

    fn on_failure(&self, provider: ProviderId, error: &ProviderError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, error, elapsed)
        }));
    }
}

/// Absorbs panics raised by the wrapped chat runtime hooks.
pub struct SafeChatHooks<H> {
    inner: H,
}

impl<H> SafeChatHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ChatRuntimeHooks for SafeChatHooks<H>
where
    H: ChatRuntimeHooks,
{
    fn on_run_start(&self, session_key: &SessionKey, run_id: &RunId) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_run_start(session_key, run_id)
        }));
    }

    fn on_run_finish(
        &self,
        session_key: &SessionKey,
        run_id: &RunId,
        status: RunStatus,
        error: Option<&ChatError>,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_run_finish(session_key, run_id, status, error, elapsed)
        }));
    }

    fn on_persistence_failure(
        &self,
        session_key: &SessionKey,
        operation: &'static str,
        error: &MemoryError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_persistence_failure(session_key, operation, error)
        }));
    }
}
