//! Cached, per-key serialized access to sessions.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fcommon::SessionKey;

use crate::backend::{FilesystemSessionBackend, InMemorySessionBackend, SessionBackend};
use crate::error::MemoryError;
use crate::types::{ChatMessage, Session, SessionSummary, ThinkingLevel};

/// Outcome of a mutating store call.
///
/// The in-memory update always happens; `persisted` reports whether the durable copy
/// followed. Callers may log the failure but must not surface it to the user.
#[derive(Debug, Clone)]
pub struct StoreWrite {
    pub session: Session,
    pub persisted: Result<(), MemoryError>,
}

impl StoreWrite {
    pub fn is_persisted(&self) -> bool {
        self.persisted.is_ok()
    }
}

#[derive(Debug, Default)]
struct Slot {
    session: Option<Session>,
    // Loaded from a record or written at least once; fresh untouched sessions stay unlisted.
    listed: bool,
}

/// Durable session store with an authoritative in-memory cache.
///
/// Every operation on one key holds that key's lock for its whole read-modify-write,
/// including the backend write, so interleaved appends cannot lose updates.
///
/// ```rust
/// use fcommon::SessionKey;
/// use fmemory::{ChatMessage, SessionStore};
///
/// let store = SessionStore::in_memory();
/// let key = SessionKey::from("main");
///
/// let write = store.append(&key, ChatMessage::user("hello"));
/// assert!(write.is_persisted());
/// assert_eq!(store.get_or_create(&key).messages.len(), 1);
/// ```
#[derive(Debug)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    slots: Mutex<HashMap<SessionKey, Arc<Mutex<Slot>>>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// File-backed store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        Ok(Self::new(Arc::new(FilesystemSessionBackend::new(root)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionBackend::new()))
    }

    pub fn backend(&self) -> Arc<dyn SessionBackend> {
        Arc::clone(&self.backend)
    }

    /// Never fails: a missing or unreadable record yields a fresh empty session.
    pub fn get_or_create(&self, key: &SessionKey) -> Session {
        let slot = self.slot(key);
        let mut guard = lock(&slot);
        self.resident(key, &mut guard).clone()
    }

    pub fn append(&self, key: &SessionKey, message: ChatMessage) -> StoreWrite {
        self.mutate(key, "append", |session| session.messages.push(message))
    }

    /// Stores the normalized level; see [`ThinkingLevel::normalize`].
    pub fn set_thinking_level(&self, key: &SessionKey, level: &str) -> StoreWrite {
        let level = ThinkingLevel::normalize(level);
        self.mutate(key, "set_thinking_level", |session| {
            session.thinking_level = level;
        })
    }

    /// Empties the transcript; the session itself is kept.
    pub fn clear(&self, key: &SessionKey) -> StoreWrite {
        self.mutate(key, "clear", |session| session.messages.clear())
    }

    /// A blank name removes the display name.
    pub fn rename(&self, key: &SessionKey, display_name: Option<&str>) -> StoreWrite {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self.mutate(key, "rename", |session| session.display_name = display_name)
    }

    /// Stored sessions overlaid with the cache, newest first, ties ordered by key ascending.
    pub fn list(&self) -> Vec<Session> {
        let mut by_key = BTreeMap::new();

        match self.backend.load_all() {
            Ok(records) => {
                for record in records {
                    match record {
                        Ok(session) => {
                            by_key.insert(session.key.clone(), session);
                        }
                        Err(error) => {
                            tracing::warn!(
                                phase = "memory",
                                event = "record_skipped",
                                error = %error,
                                "skipping unreadable session record"
                            );
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(
                    phase = "memory",
                    event = "list_failed",
                    error = %error,
                    "listing stored sessions failed; using cached sessions only"
                );
            }
        }

        for slot in self.cached_slots() {
            let guard = lock(&slot);
            if let (Some(session), true) = (guard.session.as_ref(), guard.listed) {
                by_key.insert(session.key.clone(), session.clone());
            }
        }

        let mut sessions: Vec<Session> = by_key.into_values().collect();
        sessions.sort_by(|left, right| {
            right
                .updated_at
                .cmp(&left.updated_at)
                .then_with(|| left.key.cmp(&right.key))
        });
        sessions
    }

    pub fn summaries(&self, limit: usize) -> Vec<SessionSummary> {
        self.list()
            .iter()
            .take(limit)
            .map(Session::summary)
            .collect()
    }

    fn mutate(
        &self,
        key: &SessionKey,
        operation: &'static str,
        apply: impl FnOnce(&mut Session),
    ) -> StoreWrite {
        let slot = self.slot(key);
        let mut guard = lock(&slot);

        let session = self.resident(key, &mut guard);
        apply(session);
        session.touch();
        let snapshot = session.clone();
        guard.listed = true;

        let persisted = self.backend.save(&snapshot);
        if let Err(error) = &persisted {
            tracing::warn!(
                phase = "memory",
                event = "persist_failed",
                session_key = %key,
                operation,
                error = %error,
                "session change kept in memory only"
            );
        }

        StoreWrite {
            session: snapshot,
            persisted,
        }
    }

    fn resident<'s>(&self, key: &SessionKey, slot: &'s mut Slot) -> &'s mut Session {
        let listed = &mut slot.listed;
        slot.session.get_or_insert_with(|| match self.backend.load(key) {
            Ok(session) => {
                *listed = true;
                session
            }
            Err(error) if error.is_not_found() => Session::new(key.clone()),
            Err(error) => {
                tracing::warn!(
                    phase = "memory",
                    event = "load_failed",
                    session_key = %key,
                    error = %error,
                    "starting an empty session in place of an unreadable record"
                );
                Session::new(key.clone())
            }
        })
    }

    fn slot(&self, key: &SessionKey) -> Arc<Mutex<Slot>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn cached_slots(&self) -> Vec<Arc<Mutex<Slot>>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().cloned().collect()
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
