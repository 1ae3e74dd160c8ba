//! Tracing-based hooks for completion calls and chat runs.
//!
//! ```rust
//! use fchat::ChatRuntimeHooks;
//! use fobserve::TracingObservabilityHooks;
//!
//! fn accepts_chat_hooks(_hooks: &dyn ChatRuntimeHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_chat_hooks(&hooks);
//! ```

use std::time::Duration;

use fchat::{ChatError, ChatRuntimeHooks, RunStatus};
use fcommon::{RunId, SessionKey};
use fmemory::MemoryError;
use fprovider::{CompletionResult, ProviderError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_request_start(&self, provider: ProviderId, model: &str) {
        tracing::info!(
            phase = "provider",
            event = "request_start",
            provider = %provider,
            model
        );
    }

    fn on_success(
        &self,
        provider: ProviderId,
        result: &CompletionResult,
        skipped_events: u32,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            stop_reason = result.stop_reason.as_deref(),
            input_tokens = result.input_tokens,
            output_tokens = result.output_tokens,
            reply_chars = result.text.chars().count() as u64,
            elapsed_ms = elapsed.as_millis() as u64
        );
        if skipped_events > 0 {
            tracing::warn!(
                phase = "provider",
                event = "skipped_events",
                provider = %provider,
                skipped_events,
                "ignored stream events that were not valid JSON"
            );
        }
    }

    fn on_failure(&self, provider: ProviderId, error: &ProviderError, elapsed: Duration) {
        if error.is_cancelled() {
            tracing::info!(
                phase = "provider",
                event = "cancelled",
                provider = %provider,
                elapsed_ms = elapsed.as_millis() as u64
            );
            return;
        }
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            error_kind = ?error.kind,
            status = error.status,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }
}

impl ChatRuntimeHooks for TracingObservabilityHooks {
    fn on_run_start(&self, session_key: &SessionKey, run_id: &RunId) {
        tracing::info!(
            phase = "chat",
            event = "run_start",
            session_key = %session_key,
            run_id = %run_id
        );
    }

    fn on_run_finish(
        &self,
        session_key: &SessionKey,
        run_id: &RunId,
        status: RunStatus,
        error: Option<&ChatError>,
        elapsed: Duration,
    ) {
        match error {
            Some(error) if status != RunStatus::Aborted => tracing::error!(
                phase = "chat",
                event = "run_finish",
                session_key = %session_key,
                run_id = %run_id,
                status = status.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                error_kind = ?error.kind,
                error = %error
            ),
            _ => tracing::info!(
                phase = "chat",
                event = "run_finish",
                session_key = %session_key,
                run_id = %run_id,
                status = status.as_str(),
                elapsed_ms = elapsed.as_millis() as u64
            ),
        }
    }

    fn on_persistence_failure(
        &self,
        session_key: &SessionKey,
        operation: &'static str,
        error: &MemoryError,
    ) {
        tracing::warn!(
            phase = "chat",
            event = "persistence_failure",
            session_key = %session_key,
            operation,
            error_kind = ?error.kind,
            error = %error
        );
    }
}
