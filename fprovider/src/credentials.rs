//! In-memory credential storage with redacted debug output.
//!
//! ```rust
//! use fprovider::{ProviderId, SecureCredentialManager};
//!
//! let credentials = SecureCredentialManager::new();
//! credentials.set_api_key(ProviderId::OpenAi, "sk-test").expect("key should set");
//! assert!(credentials.has_credentials(ProviderId::OpenAi));
//! assert_eq!(format!("{:?}", credentials.api_key(ProviderId::OpenAi)), "Some([REDACTED])");
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{ProviderError, ProviderId};

#[derive(PartialEq, Eq, Default)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // SAFETY: zero bytes are valid UTF-8.
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// One API key per provider. The runtime only ever reads from it.
#[derive(Default)]
pub struct SecureCredentialManager {
    credentials: Mutex<HashMap<ProviderId, SecretString>>,
}

impl SecureCredentialManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_api_key(
        &self,
        provider: ProviderId,
        api_key: impl Into<String>,
    ) -> Result<(), ProviderError> {
        let api_key = SecretString::new(api_key);
        if api_key.is_empty() {
            return Err(ProviderError::credential("api key must not be empty"));
        }

        self.credentials().insert(provider, api_key);
        Ok(())
    }

    pub fn has_credentials(&self, provider: ProviderId) -> bool {
        self.credentials()
            .get(&provider)
            .is_some_and(|secret| !secret.is_empty())
    }

    pub fn api_key(&self, provider: ProviderId) -> Option<SecretString> {
        self.credentials().get(&provider).cloned()
    }

    pub fn with_api_key<R>(&self, provider: ProviderId, f: impl FnOnce(&str) -> R) -> Option<R> {
        self.credentials()
            .get(&provider)
            .map(|secret| f(secret.expose()))
    }

    pub fn clear(&self, provider: ProviderId) -> bool {
        self.credentials().remove(&provider).is_some()
    }

    // Secrets stay readable after a panic elsewhere; the map holds no invariants to protect.
    fn credentials(&self) -> MutexGuard<'_, HashMap<ProviderId, SecretString>> {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SecureCredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers = self.credentials().keys().copied().collect::<Vec<_>>();
        f.debug_struct("SecureCredentialManager")
            .field("providers", &providers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn rejects_blank_api_keys() {
        let credentials = SecureCredentialManager::new();
        let error = credentials
            .set_api_key(ProviderId::Anthropic, "   ")
            .expect_err("blank key should fail");

        assert_eq!(error.kind, ProviderErrorKind::Credential);
        assert!(!credentials.has_credentials(ProviderId::Anthropic));
    }

    #[test]
    fn stores_one_key_per_provider() {
        let credentials = SecureCredentialManager::new();
        credentials
            .set_api_key(ProviderId::Anthropic, "first")
            .expect("key should set");
        credentials
            .set_api_key(ProviderId::Anthropic, "second")
            .expect("key should set");

        let exposed = credentials.with_api_key(ProviderId::Anthropic, str::to_string);
        assert_eq!(exposed.as_deref(), Some("second"));
        assert!(!credentials.has_credentials(ProviderId::OpenAi));

        assert!(credentials.clear(ProviderId::Anthropic));
        assert!(credentials.api_key(ProviderId::Anthropic).is_none());
    }

    #[test]
    fn debug_output_never_contains_the_secret() {
        let credentials = SecureCredentialManager::new();
        credentials
            .set_api_key(ProviderId::OpenAi, "sk-very-secret")
            .expect("key should set");

        let rendered = format!("{credentials:?} {:?}", credentials.api_key(ProviderId::OpenAi));
        assert!(!rendered.contains("sk-very-secret"));
    }
}
