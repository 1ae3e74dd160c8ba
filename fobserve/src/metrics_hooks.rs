//! Metrics-based hooks for completion calls and chat runs.
//!
//! ```rust
//! use fobserve::MetricsObservabilityHooks;
//! use fprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use fchat::{ChatError, ChatRuntimeHooks, RunStatus};
use fcommon::{RunId, SessionKey};
use fmemory::MemoryError;
use fprovider::{CompletionResult, ProviderError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_request_start(&self, provider: ProviderId, _model: &str) {
        metrics::counter!(
            "fagent_provider_request_start_total",
            "provider" => provider.to_string()
        )
        .increment(1);
    }

    fn on_success(
        &self,
        provider: ProviderId,
        result: &CompletionResult,
        skipped_events: u32,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "fagent_provider_success_total",
            "provider" => provider.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "fagent_provider_request_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());

        if let Some(tokens) = result.output_tokens {
            metrics::counter!(
                "fagent_provider_output_tokens_total",
                "provider" => provider.to_string()
            )
            .increment(u64::from(tokens));
        }
        if let Some(tokens) = result.input_tokens {
            metrics::counter!(
                "fagent_provider_input_tokens_total",
                "provider" => provider.to_string()
            )
            .increment(u64::from(tokens));
        }
        if skipped_events > 0 {
            metrics::counter!(
                "fagent_provider_skipped_events_total",
                "provider" => provider.to_string()
            )
            .increment(u64::from(skipped_events));
        }
    }

    fn on_failure(&self, provider: ProviderId, error: &ProviderError, elapsed: Duration) {
        metrics::counter!(
            "fagent_provider_failure_total",
            "provider" => provider.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "fagent_provider_request_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ChatRuntimeHooks for MetricsObservabilityHooks {
    fn on_run_start(&self, _session_key: &SessionKey, _run_id: &RunId) {
        metrics::counter!("fagent_chat_run_start_total").increment(1);
    }

    fn on_run_finish(
        &self,
        _session_key: &SessionKey,
        _run_id: &RunId,
        status: RunStatus,
        error: Option<&ChatError>,
        elapsed: Duration,
    ) {
        let error_kind = error
            .map(|error| format!("{:?}", error.kind))
            .unwrap_or_else(|| "none".to_string());
        metrics::counter!(
            "fagent_chat_run_finish_total",
            "status" => status.as_str(),
            "error_kind" => error_kind
        )
        .increment(1);
        metrics::histogram!(
            "fagent_chat_run_duration_seconds",
            "status" => status.as_str()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_persistence_failure(
        &self,
        _session_key: &SessionKey,
        operation: &'static str,
        error: &MemoryError,
    ) {
        metrics::counter!(
            "fagent_chat_persistence_failure_total",
            "operation" => operation,
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}
