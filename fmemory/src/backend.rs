//! Session persistence trait and the in-memory backend.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fcommon::SessionKey;

use crate::error::MemoryError;
use crate::types::Session;

pub use crate::backends::filesystem::FilesystemSessionBackend;

/// Durable record storage beneath [`crate::SessionStore`].
///
/// Calls are synchronous; the store serializes them per session key.
pub trait SessionBackend: Send + Sync + Debug {
    /// Fails with [`MemoryError::not_found`] when no record exists for `key`.
    fn load(&self, key: &SessionKey) -> Result<Session, MemoryError>;

    fn save(&self, session: &Session) -> Result<(), MemoryError>;

    /// Every stored record, each parsed independently so one bad record does not hide the rest.
    fn load_all(&self) -> Result<Vec<Result<Session, MemoryError>>, MemoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionBackendConfig {
    InMemory,
    Filesystem { root: PathBuf },
}

pub fn create_session_backend(
    config: SessionBackendConfig,
) -> Result<Arc<dyn SessionBackend>, MemoryError> {
    match config {
        SessionBackendConfig::InMemory => Ok(Arc::new(InMemorySessionBackend::new())),
        SessionBackendConfig::Filesystem { root } => {
            Ok(Arc::new(FilesystemSessionBackend::new(root)?))
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionBackend {
    records: Mutex<HashMap<SessionKey, Session>>,
}

impl InMemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for InMemorySessionBackend {
    fn load(&self, key: &SessionKey) -> Result<Session, MemoryError> {
        let records = self
            .records
            .lock()
            .map_err(|_| MemoryError::storage("memory backend lock poisoned"))?;

        records
            .get(key)
            .cloned()
            .ok_or_else(|| MemoryError::not_found(format!("no stored session for '{key}'")))
    }

    fn save(&self, session: &Session) -> Result<(), MemoryError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| MemoryError::storage("memory backend lock poisoned"))?;

        records.insert(session.key.clone(), session.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Result<Session, MemoryError>>, MemoryError> {
        let records = self
            .records
            .lock()
            .map_err(|_| MemoryError::storage("memory backend lock poisoned"))?;

        Ok(records.values().cloned().map(Ok).collect())
    }
}
