//! The completion seam used by the chat controller and its HTTP-backed implementation.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::adapters::{anthropic, openai};
use crate::{
    CompletionRequest, CompletionResult, HttpRequest, HttpTransport, NoopOperationHooks,
    ProviderError, ProviderFuture, ProviderId, ProviderOperationHooks, StreamDecoder,
    StreamProgress, WireFormat, catalog,
};

/// Receives the cumulative assistant text after every text-bearing stream event.
pub type StreamCallback<'a> = Box<dyn FnMut(&str) + Send + 'a>;

pub trait CompletionProvider: Send + Sync {
    /// Streams one completion.
    ///
    /// Resolves to [`ProviderError::cancelled`] as soon as `cancel` fires, without waiting
    /// for the remote stream. Text already delivered through `on_text` is not retracted.
    fn send<'a>(
        &'a self,
        request: CompletionRequest,
        cancel: CancellationToken,
        on_text: StreamCallback<'a>,
    ) -> ProviderFuture<'a, Result<CompletionResult, ProviderError>>;
}

#[derive(Clone)]
pub struct CompletionService {
    transport: Arc<dyn HttpTransport>,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl CompletionService {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build_http_request(request: &CompletionRequest) -> Result<HttpRequest, ProviderError> {
        request.config.validate()?;

        let endpoint = request.config.endpoint();
        match catalog::profile(request.config.provider).wire {
            WireFormat::Messages => anthropic::build_request(&endpoint, request),
            WireFormat::ChatCompletions => openai::build_request(&endpoint, request),
        }
    }

    async fn stream_completion<F>(
        &self,
        provider: ProviderId,
        http_request: HttpRequest,
        cancel: &CancellationToken,
        on_text: &mut F,
    ) -> Result<(CompletionResult, u32), ProviderError>
    where
        F: FnMut(&str) + Send + ?Sized,
    {
        let mut body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            opened = self.transport.post_stream(http_request) => opened?,
        };

        let mut decoder = StreamDecoder::new(provider);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                next = body.next() => next,
            };

            let Some(chunk) = next else {
                break;
            };

            if decoder.feed(&chunk?, &mut *on_text)? == StreamProgress::Done {
                break;
            }
        }

        let skipped = decoder.skipped_events();
        let result = decoder.finish(&mut *on_text)?;
        Ok((result, skipped))
    }
}

impl std::fmt::Debug for CompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionService")
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl CompletionProvider for CompletionService {
    fn send<'a>(
        &'a self,
        request: CompletionRequest,
        cancel: CancellationToken,
        mut on_text: StreamCallback<'a>,
    ) -> ProviderFuture<'a, Result<CompletionResult, ProviderError>> {
        Box::pin(async move {
            let provider = request.config.provider;
            let http_request = Self::build_http_request(&request)?;

            self.hooks
                .on_request_start(provider, request.config.effective_model());
            let started = Instant::now();

            match self
                .stream_completion(provider, http_request, &cancel, &mut *on_text)
                .await
            {
                Ok((result, skipped)) => {
                    self.hooks
                        .on_success(provider, &result, skipped, started.elapsed());
                    Ok(result)
                }
                Err(error) => {
                    self.hooks.on_failure(provider, &error, started.elapsed());
                    Err(error)
                }
            }
        })
    }
}

fn cancelled() -> ProviderError {
    ProviderError::cancelled("completion cancelled")
}
