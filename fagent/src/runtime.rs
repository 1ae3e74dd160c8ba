//! Production wiring for a [`ChatController`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    ChatController, ChatError, CompletionProvider, CompletionService, ConfigStore,
    ControllerPolicy, ReqwestTransport, SafeChatHooks, SafeProviderHooks, SessionStore,
    TracingObservabilityHooks,
};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reqwest-backed completion service reporting through tracing.
pub fn completion_service(client: reqwest::Client) -> Arc<dyn CompletionProvider> {
    let transport = Arc::new(ReqwestTransport::new(client));
    Arc::new(
        CompletionService::new(transport)
            .with_hooks(Arc::new(SafeProviderHooks::new(TracingObservabilityHooks))),
    )
}

/// Controller over sessions stored as JSON records in `sessions_dir`, with default policy.
///
/// Must be called from inside a Tokio runtime; runs are spawned onto the current one.
pub fn build_controller(
    config_store: Arc<dyn ConfigStore>,
    sessions_dir: impl AsRef<Path>,
) -> Result<ChatController, ChatError> {
    build_controller_with(config_store, sessions_dir, ControllerPolicy::default())
}

pub fn build_controller_with(
    config_store: Arc<dyn ConfigStore>,
    sessions_dir: impl AsRef<Path>,
    policy: ControllerPolicy,
) -> Result<ChatController, ChatError> {
    let sessions_dir = sessions_dir.as_ref();
    let store = Arc::new(SessionStore::open(sessions_dir)?);

    let client = reqwest::Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .map_err(|error| ChatError::transport(format!("failed to build HTTP client: {error}")))?;

    let controller = ChatController::builder(store)
        .provider(completion_service(client))
        .config_store(config_store)
        .hooks(Arc::new(SafeChatHooks::new(TracingObservabilityHooks)))
        .policy(policy)
        .build()?;

    tracing::info!(
        phase = "runtime",
        event = "controller_ready",
        sessions_dir = %sessions_dir.display(),
        session_key = %controller.active_session()
    );
    Ok(controller)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        ChatErrorKind, ConfigStore, ControllerPolicy, InMemoryConfigStore, ProviderConfig,
        ProviderId,
    };

    use super::{build_controller, build_controller_with};

    fn config(credential: &str) -> Arc<dyn ConfigStore> {
        Arc::new(InMemoryConfigStore::new(
            ProviderConfig::for_provider(ProviderId::Anthropic).with_credential(credential),
        ))
    }

    #[tokio::test]
    async fn build_controller_creates_the_sessions_directory() {
        let dir = tempfile::tempdir().expect("temp dir should exist");
        let sessions = dir.path().join("nested").join("sessions");

        let controller = build_controller(config("sk-ant-1"), &sessions)
            .expect("controller should build");

        assert!(sessions.is_dir());
        assert!(controller.state().provider_reachable);
        assert_eq!(controller.active_session().as_str(), "main");
    }

    #[tokio::test]
    async fn invalid_policy_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir should exist");
        let policy = ControllerPolicy::default().with_attachment_placeholder("  ");

        let error = build_controller_with(config("sk-ant-1"), dir.path(), policy)
            .expect_err("blank placeholder should be rejected");

        assert_eq!(error.kind, ChatErrorKind::InvalidRequest);
    }

    #[test]
    fn building_outside_a_runtime_fails() {
        let dir = tempfile::tempdir().expect("temp dir should exist");

        let error = build_controller(config("sk-ant-1"), dir.path())
            .expect_err("no runtime is available");

        assert_eq!(error.kind, ChatErrorKind::InvalidRequest);
    }
}
