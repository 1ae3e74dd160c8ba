//! Operational hook contracts for completion calls.

use std::time::Duration;

use crate::{CompletionResult, ProviderError, ProviderId};

pub trait ProviderOperationHooks: Send + Sync {
    fn on_request_start(&self, _provider: ProviderId, _model: &str) {}

    fn on_success(
        &self,
        _provider: ProviderId,
        _result: &CompletionResult,
        _skipped_events: u32,
        _elapsed: Duration,
    ) {
    }

    fn on_failure(&self, _provider: ProviderId, _error: &ProviderError, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}
