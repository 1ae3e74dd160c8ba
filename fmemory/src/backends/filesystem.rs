use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fcommon::SessionKey;
use fprovider::Role;
use serde::{Deserialize, Serialize};

use crate::backend::SessionBackend;
use crate::error::MemoryError;
use crate::types::{ChatMessage, Session, ThinkingLevel, from_millis, to_millis};

const RECORD_EXTENSION: &str = "json";

/// One pretty-printed JSON file per session key under `root`.
#[derive(Debug)]
pub struct FilesystemSessionBackend {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FilesystemSessionBackend {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|error| {
            MemoryError::storage(format!("failed to create session directory: {error}"))
        })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, key: &SessionKey) -> PathBuf {
        self.root
            .join(format!("{}.{RECORD_EXTENSION}", file_stem(key)))
    }

    fn read_record(path: &Path) -> Result<Session, MemoryError> {
        let bytes = fs::read(path).map_err(|error| {
            MemoryError::storage(format!(
                "failed to read session record {}: {error}",
                path.display()
            ))
        })?;
        let record = serde_json::from_slice::<SessionRecord>(&bytes).map_err(|error| {
            MemoryError::serialization(format!(
                "failed to parse session record {}: {error}",
                path.display()
            ))
        })?;
        record.into_session()
    }
}

impl SessionBackend for FilesystemSessionBackend {
    fn load(&self, key: &SessionKey) -> Result<Session, MemoryError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem backend lock poisoned"))?;

        let path = self.record_path(key);
        if !path.exists() {
            return Err(MemoryError::not_found(format!(
                "no stored session for '{key}'"
            )));
        }

        let session = Self::read_record(&path)?;
        if &session.key != key {
            return Err(MemoryError::not_found(format!(
                "record {} belongs to '{}', not '{key}'",
                path.display(),
                session.key
            )));
        }
        Ok(session)
    }

    fn save(&self, session: &Session) -> Result<(), MemoryError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem backend lock poisoned"))?;

        let bytes = serde_json::to_vec_pretty(&SessionRecord::from_session(session))
            .map_err(|error| {
                MemoryError::serialization(format!("failed to serialize session: {error}"))
            })?;

        write_atomic(&self.record_path(&session.key), &bytes)
    }

    fn load_all(&self) -> Result<Vec<Result<Session, MemoryError>>, MemoryError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem backend lock poisoned"))?;

        let entries = fs::read_dir(&self.root).map_err(|error| {
            MemoryError::storage(format!("failed to list session directory: {error}"))
        })?;

        let mut sessions = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(error) => {
                    sessions.push(Err(MemoryError::storage(format!(
                        "failed to read directory entry: {error}"
                    ))));
                    continue;
                }
            };

            let is_record = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION);
            if is_record {
                sessions.push(Self::read_record(&path));
            }
        }
        Ok(sessions)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default)]
    messages: Vec<MessageRecord>,
    #[serde(default)]
    thinking_level: String,
    updated_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct MessageRecord {
    id: String,
    role: String,
    content: String,
    timestamp: u64,
}

impl SessionRecord {
    fn from_session(session: &Session) -> Self {
        Self {
            key: session.key.as_str().to_string(),
            display_name: session.display_name.clone(),
            messages: session
                .messages
                .iter()
                .map(|message| MessageRecord {
                    id: message.id.clone(),
                    role: message.role.as_str().to_string(),
                    content: message.content.clone(),
                    timestamp: to_millis(message.timestamp),
                })
                .collect(),
            thinking_level: session.thinking_level.as_str().to_string(),
            updated_at: to_millis(session.updated_at),
        }
    }

    fn into_session(self) -> Result<Session, MemoryError> {
        let messages = self
            .messages
            .into_iter()
            .map(|message| {
                let role = Role::parse(&message.role).ok_or_else(|| {
                    MemoryError::serialization(format!("unknown message role '{}'", message.role))
                })?;
                Ok(ChatMessage {
                    id: message.id,
                    role,
                    content: message.content,
                    timestamp: from_millis(message.timestamp),
                })
            })
            .collect::<Result<Vec<_>, MemoryError>>()?;

        Ok(Session {
            key: SessionKey::from(self.key),
            display_name: self.display_name,
            messages,
            thinking_level: ThinkingLevel::normalize(&self.thinking_level),
            updated_at: from_millis(self.updated_at),
        })
    }
}

/// Path-unsafe characters become `_`; keys that needed rewriting get a hash suffix so two
/// keys never share a file.
fn file_stem(key: &SessionKey) -> String {
    let raw = key.as_str();
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    if sanitized == raw && !raw.is_empty() && !raw.starts_with('.') {
        sanitized
    } else {
        format!("{sanitized}-{:016x}", fnv1a(raw.as_bytes()))
    }
}

// Stable across builds, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
    let Some(parent) = path.parent() else {
        return Err(MemoryError::storage(
            "session record missing parent directory",
        ));
    };
    fs::create_dir_all(parent).map_err(|error| {
        MemoryError::storage(format!("failed to create parent directory: {error}"))
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|error| {
        MemoryError::storage(format!("failed to write temporary session record: {error}"))
    })?;

    fs::rename(&tmp, path).map_err(|error| {
        MemoryError::storage(format!("failed to finalize session record: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_keys_map_to_their_own_file_name() {
        assert_eq!(file_stem(&SessionKey::from("main")), "main");
        assert_eq!(file_stem(&SessionKey::from("team-42_a.b")), "team-42_a.b");
    }

    #[test]
    fn unsafe_keys_are_replaced_and_disambiguated() {
        let colon = file_stem(&SessionKey::from("agent:main"));
        let slash = file_stem(&SessionKey::from("agent/main"));

        assert!(colon.starts_with("agent_main-"));
        assert!(slash.starts_with("agent_main-"));
        assert_ne!(colon, slash);
        assert!(!file_stem(&SessionKey::from("../escape")).contains('/'));
        assert!(file_stem(&SessionKey::from("..")).starts_with("..-"));
    }

    #[test]
    fn record_uses_camel_case_fields_and_millisecond_times() {
        let mut session = Session::new(SessionKey::from("main"));
        session.display_name = Some("Main".to_string());
        session.thinking_level = ThinkingLevel::High;
        session.messages.push(ChatMessage::user("hello").with_id("m-1"));

        let value = serde_json::to_value(SessionRecord::from_session(&session))
            .expect("record should serialize");

        assert_eq!(value["key"], "main");
        assert_eq!(value["displayName"], "Main");
        assert_eq!(value["thinkingLevel"], "high");
        assert_eq!(value["messages"][0]["id"], "m-1");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value["updatedAt"].is_u64());
    }

    #[test]
    fn unknown_roles_make_the_record_unreadable() {
        let record: SessionRecord = serde_json::from_str(
            r#"{"key":"x","messages":[{"id":"1","role":"tool","content":"c","timestamp":1}],"thinkingLevel":"off","updatedAt":1}"#,
        )
        .expect("record should parse");

        let error = record.into_session().expect_err("role should be rejected");
        assert_eq!(error.kind, crate::MemoryErrorKind::Serialization);
    }

    #[test]
    fn unknown_thinking_levels_load_as_off() {
        let record: SessionRecord =
            serde_json::from_str(r#"{"key":"x","thinkingLevel":"extreme","updatedAt":5}"#)
                .expect("record should parse");

        let session = record.into_session().expect("record should convert");
        assert_eq!(session.thinking_level, ThinkingLevel::Off);
        assert!(session.messages.is_empty());
    }
}
