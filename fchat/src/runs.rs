//! Pending-run set, watchdog handles and bounded history, guarded together by the controller.

use std::collections::VecDeque;

use fcommon::{RunId, SessionKey};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{RunRecord, RunStatus};

#[derive(Debug)]
pub(crate) struct PendingRun {
    pub(crate) run_id: RunId,
    pub(crate) session_key: SessionKey,
    pub(crate) cancel: CancellationToken,
    pub(crate) watchdog: Option<JoinHandle<()>>,
    pub(crate) started: Instant,
}

impl PendingRun {
    pub(crate) fn new(run_id: RunId, session_key: SessionKey) -> Self {
        Self {
            run_id,
            session_key,
            cancel: CancellationToken::new(),
            watchdog: None,
            started: Instant::now(),
        }
    }

    // Stops the in-flight call and disarms the watchdog.
    fn release(&mut self) {
        self.cancel.cancel();
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }
}

/// Pending runs in launch order plus the most recent terminal records.
#[derive(Debug)]
pub(crate) struct RunRegistry {
    pending: Vec<PendingRun>,
    history: VecDeque<RunRecord>,
    history_limit: usize,
}

impl RunRegistry {
    pub(crate) fn new(history_limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: VecDeque::new(),
            history_limit,
        }
    }

    pub(crate) fn register(&mut self, run: PendingRun) {
        self.pending.push(run);
    }

    pub(crate) fn arm_watchdog(&mut self, run_id: &RunId, watchdog: JoinHandle<()>) {
        match self.pending.iter_mut().find(|run| &run.run_id == run_id) {
            Some(run) => run.watchdog = Some(watchdog),
            None => watchdog.abort(),
        }
    }

    pub(crate) fn is_pending(&self, run_id: &RunId) -> bool {
        self.pending.iter().any(|run| &run.run_id == run_id)
    }

    pub(crate) fn session_of(&self, run_id: &RunId) -> Option<&SessionKey> {
        self.pending
            .iter()
            .find(|run| &run.run_id == run_id)
            .map(|run| &run.session_key)
    }

    pub(crate) fn latest(&self) -> Option<RunId> {
        self.pending.last().map(|run| run.run_id.clone())
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn pending_in(&self, session_key: &SessionKey) -> Vec<RunId> {
        self.pending
            .iter()
            .filter(|run| &run.session_key == session_key)
            .map(|run| run.run_id.clone())
            .collect()
    }

    /// Moves a pending run into `status`. Returns `None` when the run already settled, so
    /// each run reaches exactly one terminal status.
    pub(crate) fn finish(&mut self, run_id: &RunId, status: RunStatus) -> Option<PendingRun> {
        let index = self.pending.iter().position(|run| &run.run_id == run_id)?;
        let mut run = self.pending.remove(index);
        run.release();
        self.remember(RunRecord {
            run_id: run.run_id.clone(),
            session_key: run.session_key.clone(),
            status,
        });
        Some(run)
    }

    pub(crate) fn finish_all(&mut self, status: RunStatus) -> Vec<PendingRun> {
        let run_ids: Vec<RunId> = self.pending.iter().map(|run| run.run_id.clone()).collect();
        run_ids
            .iter()
            .filter_map(|run_id| self.finish(run_id, status))
            .collect()
    }

    pub(crate) fn status(&self, run_id: &RunId) -> Option<RunStatus> {
        if self.is_pending(run_id) {
            return Some(RunStatus::Pending);
        }
        self.history
            .iter()
            .rev()
            .find(|record| &record.run_id == run_id)
            .map(|record| record.status)
    }

    fn remember(&mut self, record: RunRecord) {
        if self.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> PendingRun {
        PendingRun::new(RunId::new(id), SessionKey::from("main"))
    }

    #[tokio::test]
    async fn finish_settles_a_run_exactly_once() {
        let mut registry = RunRegistry::new(8);
        registry.register(pending("run-1"));
        let run_id = RunId::new("run-1");

        let first = registry.finish(&run_id, RunStatus::TimedOut);
        let second = registry.finish(&run_id, RunStatus::Completed);

        let released = first.expect("first finish should settle the run");
        assert!(released.cancel.is_cancelled());
        assert!(second.is_none());
        assert_eq!(registry.status(&run_id), Some(RunStatus::TimedOut));
        assert_eq!(registry.pending_len(), 0);
    }

    #[tokio::test]
    async fn latest_tracks_launch_order() {
        let mut registry = RunRegistry::new(8);
        registry.register(pending("run-1"));
        registry.register(pending("run-2"));
        assert_eq!(registry.latest(), Some(RunId::new("run-2")));

        registry.finish(&RunId::new("run-2"), RunStatus::Aborted);
        assert_eq!(registry.latest(), Some(RunId::new("run-1")));
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let mut registry = RunRegistry::new(2);
        for id in ["a", "b", "c"] {
            registry.register(pending(id));
            registry.finish(&RunId::new(id), RunStatus::Completed);
        }

        assert_eq!(registry.status(&RunId::new("a")), None);
        assert_eq!(
            registry.status(&RunId::new("c")),
            Some(RunStatus::Completed)
        );
    }

    #[tokio::test]
    async fn finish_all_aborts_every_pending_run_and_its_watchdog() {
        let mut registry = RunRegistry::new(8);
        registry.register(pending("run-1"));
        registry.register(pending("run-2"));
        let watchdog = tokio::spawn(std::future::pending::<()>());
        registry.arm_watchdog(&RunId::new("run-1"), watchdog);

        let released = registry.finish_all(RunStatus::Aborted);

        assert_eq!(released.len(), 2);
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(
            registry.status(&RunId::new("run-1")),
            Some(RunStatus::Aborted)
        );
    }

    #[tokio::test]
    async fn arming_a_settled_run_aborts_the_watchdog() {
        let mut registry = RunRegistry::new(8);
        let watchdog = tokio::spawn(std::future::pending::<()>());
        let handle = watchdog.abort_handle();

        registry.arm_watchdog(&RunId::new("gone"), watchdog);

        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("watchdog for an unknown run should be aborted");
    }
}
