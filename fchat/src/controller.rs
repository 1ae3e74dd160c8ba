//! Session and run orchestration with a published, observable state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fcommon::{RunId, SessionKey};
use fmemory::{ChatMessage, SessionStore, SessionSummary, StoreWrite, ThinkingLevel};
use fprovider::{CompletionProvider, CompletionRequest, ConfigStore, StreamCallback};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::runs::{PendingRun, RunRegistry};
use crate::{
    Attachment, ChatError, ChatRuntimeHooks, ChatState, ControllerPolicy, NoopChatRuntimeHooks,
    RunStatus,
};

pub struct ChatControllerBuilder {
    store: Arc<SessionStore>,
    provider: Option<Arc<dyn CompletionProvider>>,
    config: Option<Arc<dyn ConfigStore>>,
    hooks: Arc<dyn ChatRuntimeHooks>,
    policy: ControllerPolicy,
    session_key: SessionKey,
    runtime: Option<Handle>,
}

impl ChatControllerBuilder {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            provider: None,
            config: None,
            hooks: Arc::new(NoopChatRuntimeHooks),
            policy: ControllerPolicy::default(),
            session_key: SessionKey::default(),
            runtime: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config_store(mut self, config: Arc<dyn ConfigStore>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ChatRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(mut self, policy: ControllerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn session_key(mut self, session_key: impl Into<SessionKey>) -> Self {
        self.session_key = session_key.into();
        self
    }

    /// Runtime that completion calls and watchdogs are spawned on. Defaults to the
    /// runtime `build` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<ChatController, ChatError> {
        self.policy.validate()?;

        let provider = self.provider.ok_or_else(|| {
            ChatError::invalid_request("provider is required to build a controller")
        })?;
        let config = self.config.ok_or_else(|| {
            ChatError::invalid_request("config store is required to build a controller")
        })?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| {
                ChatError::invalid_request("a Tokio runtime is required to launch runs")
            })?,
        };

        let session = self.store.get_or_create(&self.session_key);
        let initial = ChatState {
            session_key: self.session_key.clone(),
            transcript: session.messages,
            thinking_level: session.thinking_level,
            sessions: self.store.summaries(self.policy.session_list_limit),
            error: None,
            provider_reachable: provider_reachable(config.as_ref()),
            streaming_text: None,
            pending_runs: 0,
        };
        let (state, _) = watch::channel(initial);

        Ok(ChatController {
            inner: Arc::new(Inner {
                store: self.store,
                provider,
                config,
                hooks: self.hooks,
                runtime,
                control: Mutex::new(Control {
                    active: self.session_key,
                    runs: RunRegistry::new(self.policy.finished_run_history),
                }),
                policy: self.policy,
                state,
            }),
        })
    }
}

/// Drives one active session and any number of concurrently pending runs.
///
/// Every run owns a cancellation token and a timeout watchdog. A run settles exactly once
/// into `completed`, `errored`, `timed_out` or `aborted`; whichever transition claims it
/// first wins and later events for that run are dropped.
#[derive(Clone)]
pub struct ChatController {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<SessionStore>,
    provider: Arc<dyn CompletionProvider>,
    config: Arc<dyn ConfigStore>,
    hooks: Arc<dyn ChatRuntimeHooks>,
    policy: ControllerPolicy,
    runtime: Handle,
    control: Mutex<Control>,
    state: watch::Sender<ChatState>,
}

// The active key and the run registry share one critical section; state published while
// holding it always agrees with the registry.
struct Control {
    active: SessionKey,
    runs: RunRegistry,
}

impl ChatController {
    pub fn builder(store: Arc<SessionStore>) -> ChatControllerBuilder {
        ChatControllerBuilder::new(store)
    }

    /// Receivers observe every published change. Do not hold a borrow across controller calls.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ChatState {
        self.inner.state.borrow().clone()
    }

    pub fn active_session(&self) -> SessionKey {
        self.inner.lock_control().active.clone()
    }

    pub fn policy(&self) -> &ControllerPolicy {
        &self.inner.policy
    }

    /// Status of a pending run, or of one of the most recent finished runs.
    pub fn run_status(&self, run_id: &RunId) -> Option<RunStatus> {
        self.inner.lock_control().runs.status(run_id)
    }

    /// Appends the user message and launches a completion in the background.
    ///
    /// Returns `None` without side effects when there is neither text nor an attachment.
    /// Blank text with attachments is stored as the policy's placeholder. If the session is
    /// switched before the run launches, the run is returned already aborted.
    pub fn send_message(&self, text: &str, attachments: &[Attachment]) -> Option<RunId> {
        let inner = &self.inner;
        let content = if !text.trim().is_empty() {
            text.to_string()
        } else if !attachments.is_empty() {
            inner.policy.attachment_placeholder.clone()
        } else {
            return None;
        };

        let session_key = self.active_session();
        let write = inner.store.append(&session_key, ChatMessage::user(content));
        inner.report_persistence(&session_key, "append", &write);

        let run_id = RunId::generate();
        let reachable = provider_reachable(inner.config.as_ref());
        let (cancel, superseded) = {
            let mut control = inner.lock_control();
            let run = PendingRun::new(run_id.clone(), session_key.clone());
            let cancel = run.cancel.clone();
            control.runs.register(run);

            // A switch between the append and this lock already aborted everything pending;
            // a run for the session it left is recorded as aborted and never launched.
            let superseded = if control.active != session_key {
                control.runs.finish(&run_id, RunStatus::Aborted)
            } else {
                let watchdog = inner
                    .runtime
                    .spawn(Arc::clone(inner).watch_run(run_id.clone()));
                control.runs.arm_watchdog(&run_id, watchdog);

                let pending = control.runs.pending_len();
                inner.state.send_modify(|state| {
                    state.transcript = write.session.messages.clone();
                    state.streaming_text = None;
                    state.pending_runs = pending;
                    state.provider_reachable = reachable;
                });
                None
            };
            (cancel, superseded)
        };

        let attachment_names: Vec<&str> = attachments
            .iter()
            .map(|attachment| attachment.name.as_str())
            .collect();
        tracing::info!(
            phase = "chat",
            event = "message_sent",
            run_id = %run_id,
            session_key = %session_key,
            attachments = ?attachment_names
        );
        inner.hooks.on_run_start(&session_key, &run_id);

        if let Some(run) = superseded {
            tracing::debug!(
                phase = "chat",
                event = "run_superseded",
                run_id = %run_id,
                session_key = %session_key,
                "session switched before the run launched"
            );
            inner.finished(&run, RunStatus::Aborted, None);
            return Some(run_id);
        }

        inner.runtime.spawn(Arc::clone(inner).execute_run(
            run_id.clone(),
            session_key,
            cancel,
        ));
        Some(run_id)
    }

    /// Aborts the most recently launched run that is still pending.
    pub fn abort(&self) -> Option<RunId> {
        let run_id = self.inner.lock_control().runs.latest()?;
        self.abort_run(&run_id).then_some(run_id)
    }

    /// Returns `false` if the run already settled.
    pub fn abort_run(&self, run_id: &RunId) -> bool {
        self.inner.settle(run_id, RunStatus::Aborted, None)
    }

    /// Makes `session_key` active. Every pending run is aborted and transient state is reset.
    /// Returns `false` when the key is already active.
    pub fn switch_session(&self, session_key: impl Into<SessionKey>) -> bool {
        let inner = &self.inner;
        let session_key = session_key.into();

        let aborted = {
            let mut control = inner.lock_control();
            if control.active == session_key {
                return false;
            }
            control.active = session_key.clone();
            let aborted = control.runs.finish_all(RunStatus::Aborted);
            let pending = control.runs.pending_len();
            inner.state.send_modify(|state| {
                state.session_key = session_key.clone();
                state.transcript.clear();
                state.error = None;
                state.streaming_text = None;
                state.pending_runs = pending;
            });
            aborted
        };

        for run in &aborted {
            inner.finished(run, RunStatus::Aborted, None);
        }

        let session = inner.store.get_or_create(&session_key);
        let sessions = inner.store.summaries(inner.policy.session_list_limit);
        let reachable = provider_reachable(inner.config.as_ref());
        inner.publish_for(&session_key, |state| {
            state.transcript = session.messages;
            state.thinking_level = session.thinking_level;
            state.sessions = sessions;
            state.provider_reachable = reachable;
        });

        tracing::debug!(
            phase = "chat",
            event = "session_switched",
            session_key = %session_key,
            aborted_runs = aborted.len()
        );
        true
    }

    /// Same as [`ChatController::switch_session`].
    pub fn load(&self, session_key: impl Into<SessionKey>) -> bool {
        self.switch_session(session_key)
    }

    /// Normalizes `level` and stores it on the active session if it changed.
    pub fn set_thinking_level(&self, level: &str) -> ThinkingLevel {
        let inner = &self.inner;
        let level = ThinkingLevel::normalize(level);
        let session_key = self.active_session();

        if inner.store.get_or_create(&session_key).thinking_level == level {
            return level;
        }

        let write = inner.store.set_thinking_level(&session_key, level.as_str());
        inner.report_persistence(&session_key, "set_thinking_level", &write);
        inner.publish_for(&session_key, |state| {
            state.thinking_level = write.session.thinking_level;
        });
        level
    }

    /// Empties the active session's transcript, aborting its pending runs first.
    pub fn clear(&self) {
        let inner = &self.inner;
        let session_key = self.active_session();

        let aborted = {
            let mut control = inner.lock_control();
            let aborted: Vec<PendingRun> = control
                .runs
                .pending_in(&session_key)
                .iter()
                .filter_map(|run_id| control.runs.finish(run_id, RunStatus::Aborted))
                .collect();
            let pending = control.runs.pending_len();
            inner.state.send_modify(|state| {
                state.streaming_text = None;
                state.error = None;
                state.pending_runs = pending;
            });
            aborted
        };

        for run in &aborted {
            inner.finished(run, RunStatus::Aborted, None);
        }

        let write = inner.store.clear(&session_key);
        inner.report_persistence(&session_key, "clear", &write);
        let sessions = inner.store.summaries(inner.policy.session_list_limit);
        inner.publish_for(&session_key, |state| {
            state.transcript = write.session.messages.clone();
            state.sessions = sessions;
        });
    }

    /// Re-reads the session list, bounded by `limit` or the policy default.
    pub fn refresh_sessions(&self, limit: Option<usize>) -> Vec<SessionSummary> {
        let inner = &self.inner;
        let sessions = inner
            .store
            .summaries(limit.unwrap_or(inner.policy.session_list_limit));
        let reachable = provider_reachable(inner.config.as_ref());

        let _control = inner.lock_control();
        inner.state.send_modify(|state| {
            state.sessions = sessions.clone();
            state.provider_reachable = reachable;
        });
        sessions
    }
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("active", &self.active_session())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute_run(
        self: Arc<Self>,
        run_id: RunId,
        session_key: SessionKey,
        cancel: CancellationToken,
    ) {
        let transcript = self.store.get_or_create(&session_key).transcript();
        let request = CompletionRequest::new(transcript, self.config.provider_config());

        let ingress = Arc::clone(&self);
        let streaming_run = run_id.clone();
        let on_text: StreamCallback<'static> =
            Box::new(move |text: &str| ingress.ingest_stream_text(&streaming_run, text));

        match self.provider.send(request, cancel, on_text).await {
            Ok(result) => self.complete_run(&run_id, &session_key, result.text),
            // Only an abort, timeout or session switch cancels the token, and each of those
            // has already settled the run.
            Err(error) if error.is_cancelled() => {
                self.settle(&run_id, RunStatus::Aborted, None);
            }
            Err(error) => {
                self.settle(&run_id, RunStatus::Errored, Some(ChatError::from(error)));
            }
        }
    }

    async fn watch_run(self: Arc<Self>, run_id: RunId) {
        tokio::time::sleep(self.policy.run_timeout).await;
        let error = ChatError::timeout(self.policy.timeout_message());
        self.settle(&run_id, RunStatus::TimedOut, Some(error));
    }

    /// Single entry point for streamed text; text for settled or inactive runs is dropped.
    fn ingest_stream_text(&self, run_id: &RunId, text: &str) {
        let control = self.lock_control();
        let live = control
            .runs
            .session_of(run_id)
            .is_some_and(|session_key| session_key == &control.active);
        if live {
            self.state.send_modify(|state| {
                state.streaming_text = Some(text.to_string());
            });
        }
    }

    // The claim, the append and the publish share one critical section so observers never
    // see the run settled without its reply.
    fn complete_run(&self, run_id: &RunId, session_key: &SessionKey, text: String) {
        let (run, write) = {
            let mut control = self.lock_control();
            let Some(run) = control.runs.finish(run_id, RunStatus::Completed) else {
                tracing::debug!(
                    phase = "chat",
                    event = "late_reply_dropped",
                    run_id = %run_id,
                    "reply arrived after the run settled"
                );
                return;
            };

            let write = self.store.append(session_key, ChatMessage::assistant(text));
            let pending = control.runs.pending_len();
            let active = &control.active == session_key;
            self.state.send_modify(|state| {
                state.pending_runs = pending;
                if active {
                    state.transcript = write.session.messages.clone();
                    state.error = None;
                    state.streaming_text = None;
                }
            });
            (run, write)
        };

        self.report_persistence(session_key, "append", &write);
        let sessions = self.store.summaries(self.policy.session_list_limit);
        {
            let _control = self.lock_control();
            self.state.send_modify(|state| state.sessions = sessions);
        }

        self.finished(&run, RunStatus::Completed, None);
    }

    /// Settles a run that ends without a reply. Returns `false` if it had already settled.
    fn settle(&self, run_id: &RunId, status: RunStatus, error: Option<ChatError>) -> bool {
        let visible = error
            .as_ref()
            .filter(|error| error.is_user_visible())
            .map(|error| error.message.clone());

        let Some(run) = self.claim(run_id, status, |state, active| {
            state.streaming_text = None;
            if active && visible.is_some() {
                state.error = visible;
            }
        }) else {
            return false;
        };

        self.finished(&run, status, error.as_ref());
        true
    }

    fn claim(
        &self,
        run_id: &RunId,
        status: RunStatus,
        publish: impl FnOnce(&mut ChatState, bool),
    ) -> Option<PendingRun> {
        let mut control = self.lock_control();
        let run = control.runs.finish(run_id, status)?;
        let pending = control.runs.pending_len();
        let active = control.active == run.session_key;
        self.state.send_modify(|state| {
            state.pending_runs = pending;
            publish(state, active);
        });
        Some(run)
    }

    fn finished(&self, run: &PendingRun, status: RunStatus, error: Option<&ChatError>) {
        self.hooks.on_run_finish(
            &run.session_key,
            &run.run_id,
            status,
            error,
            run.started.elapsed(),
        );
    }

    /// Publishes only while `session_key` is still the active session.
    fn publish_for(&self, session_key: &SessionKey, modify: impl FnOnce(&mut ChatState)) {
        let control = self.lock_control();
        if &control.active == session_key {
            self.state.send_modify(modify);
        }
    }

    fn report_persistence(
        &self,
        session_key: &SessionKey,
        operation: &'static str,
        write: &StoreWrite,
    ) {
        if let Err(error) = &write.persisted {
            self.hooks
                .on_persistence_failure(session_key, operation, error);
        }
    }
}

fn provider_reachable(config: &dyn ConfigStore) -> bool {
    config.has_credential(config.provider_config().provider)
}
