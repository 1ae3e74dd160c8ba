//! Streaming completion client for remote AI providers.
//!
//! Translates a transcript and a [`ProviderConfig`] into a provider-specific HTTP request,
//! consumes the `data:` framed response incrementally, and yields cumulative text through a
//! callback plus a final [`CompletionResult`].
//!
//! ```rust
//! use fprovider::{CompletionRequest, CompletionService, Message, ProviderConfig, ProviderId, Role};
//!
//! let request = CompletionRequest::new(
//!     vec![Message::new(Role::User, "hello")],
//!     ProviderConfig::for_provider(ProviderId::Anthropic).with_credential("sk-ant-test"),
//! );
//!
//! let http = CompletionService::build_http_request(&request).expect("request should build");
//! assert_eq!(http.url, "https://api.anthropic.com/v1/messages");
//! ```

pub mod adapters;
pub mod catalog;
mod config;
mod credentials;
mod error;
mod hooks;
mod lines;
mod model;
pub mod prelude;
mod service;
mod stream;
mod transport;

pub use config::{
    ConfigStore, DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_PROMPT, InMemoryConfigStore, ProviderConfig,
};
pub use credentials::{SecretString, SecureCredentialManager};
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{NoopOperationHooks, ProviderOperationHooks};
pub use lines::{DONE_SENTINEL, EVENT_MARKER, LineDecoder, event_payload};
pub use model::{CompletionRequest, CompletionResult, Message, ProviderId, Role, WireFormat};
pub use service::{CompletionProvider, CompletionService, StreamCallback};
pub use stream::{StreamAccumulator, StreamDecoder, StreamProgress};
#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
pub use transport::{ByteStream, HttpRequest, HttpTransport};

pub use tokio_util::sync::CancellationToken;

pub type ProviderFuture<'a, T> = fcommon::BoxFuture<'a, T>;
