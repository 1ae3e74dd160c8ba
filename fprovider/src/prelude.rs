//! Common `fprovider` imports for downstream crates.

pub use crate::{
    CancellationToken, CompletionProvider, CompletionRequest, CompletionResult, CompletionService,
    ConfigStore, HttpRequest, HttpTransport, InMemoryConfigStore, Message, NoopOperationHooks,
    ProviderConfig, ProviderError, ProviderErrorKind, ProviderId, ProviderOperationHooks, Role,
    SecretString, StreamCallback,
};
pub use fcommon::BoxFuture;
