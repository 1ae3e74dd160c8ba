//! Provider configuration values and the read-only configuration collaborator.
//!
//! ```rust
//! use fprovider::{ConfigStore, InMemoryConfigStore, ProviderConfig, ProviderId};
//!
//! let store = InMemoryConfigStore::new(
//!     ProviderConfig::for_provider(ProviderId::OpenAi).with_max_tokens(1024),
//! );
//! assert!(!store.has_credential(ProviderId::OpenAi));
//!
//! store.set_credential(ProviderId::OpenAi, "sk-test").expect("key should set");
//! let config = store.provider_config();
//! assert_eq!(config.max_tokens, 1024);
//! assert_eq!(config.credential.expose(), "sk-test");
//! ```

use std::sync::{PoisonError, RwLock};

use crate::{ProviderError, ProviderId, SecretString, SecureCredentialManager, catalog};

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant running on the user's device. \
Answer concisely and say so when you are unsure.";

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub model: String,
    pub credential: SecretString,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub custom_endpoint: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::for_provider(ProviderId::Anthropic)
    }
}

impl ProviderConfig {
    pub fn for_provider(provider: ProviderId) -> Self {
        Self {
            provider,
            model: catalog::profile(provider).default_model.to_string(),
            credential: SecretString::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            custom_endpoint: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_credential(mut self, credential: impl Into<SecretString>) -> Self {
        self.credential = credential.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_custom_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.custom_endpoint = Some(endpoint.into());
        self
    }

    pub fn endpoint(&self) -> String {
        catalog::resolve_endpoint(self.provider, self.custom_endpoint.as_deref())
    }

    /// Blank model names fall back to the provider's catalog default.
    pub fn effective_model(&self) -> &str {
        let model = self.model.trim();
        if model.is_empty() {
            catalog::profile(self.provider).default_model
        } else {
            model
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.credential.is_empty() {
            return Err(ProviderError::credential(format!(
                "no {} API key configured",
                catalog::profile(self.provider).display_name
            )));
        }

        if self.max_tokens == 0 {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Read access to the host application's settings. The runtime never writes credentials.
pub trait ConfigStore: Send + Sync {
    /// Current selection with the selected provider's credential filled in.
    fn provider_config(&self) -> ProviderConfig;

    fn credential(&self, provider: ProviderId) -> Option<SecretString>;

    fn has_credential(&self, provider: ProviderId) -> bool {
        self.credential(provider)
            .is_some_and(|credential| !credential.is_empty())
    }
}

/// Settings held in memory, with credentials in a [`SecureCredentialManager`].
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    settings: RwLock<ProviderConfig>,
    credentials: SecureCredentialManager,
}

impl InMemoryConfigStore {
    /// A non-empty credential on `config` is moved into the credential manager.
    pub fn new(config: ProviderConfig) -> Self {
        let store = Self::default();
        store.replace(config);
        store
    }

    pub fn replace(&self, mut config: ProviderConfig) {
        let credential = std::mem::take(&mut config.credential);
        if !credential.is_empty()
            && let Err(error) = self
                .credentials
                .set_api_key(config.provider, credential.expose())
        {
            tracing::warn!(
                phase = "config",
                event = "credential_store_failed",
                provider = %config.provider,
                error = %error,
                "settings applied without the supplied credential"
            );
        }

        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn update(&self, f: impl FnOnce(&mut ProviderConfig)) {
        let mut config = self.settings();
        f(&mut config);
        self.replace(config);
    }

    pub fn set_credential(
        &self,
        provider: ProviderId,
        api_key: impl Into<String>,
    ) -> Result<(), ProviderError> {
        self.credentials.set_api_key(provider, api_key)
    }

    pub fn clear_credential(&self, provider: ProviderId) -> bool {
        self.credentials.clear(provider)
    }

    fn settings(&self) -> ProviderConfig {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn provider_config(&self) -> ProviderConfig {
        let config = self.settings();
        let credential = self.credential(config.provider).unwrap_or_default();
        config.with_credential(credential)
    }

    fn credential(&self, provider: ProviderId) -> Option<SecretString> {
        self.credentials.api_key(provider)
    }
}
