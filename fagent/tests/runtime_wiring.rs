use std::sync::Arc;
use std::time::Duration;

use fagent::prelude::*;

async fn settle(controller: &ChatController) -> ChatState {
    let mut state = controller.subscribe();
    tokio::time::timeout(
        Duration::from_secs(10),
        state.wait_for(|state| state.pending_runs == 0),
    )
    .await
    .expect("run should settle")
    .expect("controller should stay alive")
    .clone()
}

#[tokio::test]
async fn missing_credential_fails_before_any_network_call() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let config = Arc::new(InMemoryConfigStore::new(ProviderConfig::for_provider(
        ProviderId::Anthropic,
    )));
    let controller = build_controller(config, dir.path()).expect("controller should build");
    assert!(!controller.state().provider_reachable);

    let run_id = controller
        .send_message("hello", &[])
        .expect("run should launch");
    let settled = settle(&controller).await;

    assert_eq!(
        settled.error.as_deref(),
        Some("no Anthropic API key configured")
    );
    assert_eq!(settled.transcript.len(), 1);
    assert_eq!(settled.transcript[0].role, Role::User);
    assert_eq!(controller.run_status(&run_id), Some(RunStatus::Errored));
}

#[tokio::test]
async fn transcripts_survive_rebuilding_the_controller() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let config: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new(
        ProviderConfig::for_provider(ProviderId::OpenAi),
    ));

    {
        let controller =
            build_controller(Arc::clone(&config), dir.path()).expect("controller should build");
        controller.switch_session("notes");
        controller.set_thinking_level("high");
        controller.send_message("", &[Attachment::new("diagram.png")]);
        settle(&controller).await;
    }

    let controller = build_controller(config, dir.path()).expect("controller should rebuild");
    let sessions = controller.refresh_sessions(None);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].key.as_str(), "notes");

    controller.switch_session("notes");
    let state = controller.state();
    assert_eq!(state.thinking_level, ThinkingLevel::High);
    assert_eq!(state.transcript.len(), 1);
    assert_eq!(state.transcript[0].content, "See attached.");
}
