//! Shared utilities and strongly-typed identifiers for workspace crates.
//!
//! ```rust
//! use fcommon::{RunId, SessionKey};
//!
//! let session = SessionKey::from("main");
//! let run = RunId::new("run-1");
//!
//! assert_eq!(session.as_str(), "main");
//! assert_eq!(run.to_string(), "run-1");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use fcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Identifier newtypes shared by the store, provider, and controller crates.
    //!
    //! ```rust
    //! use fcommon::{RunId, SessionKey};
    //!
    //! let key = SessionKey::new("agent:main");
    //! let generated = RunId::generate();
    //!
    //! assert_eq!(key.to_string(), "agent:main");
    //! assert!(!generated.as_str().is_empty());
    //! ```

    use std::fmt::{Display, Formatter};

    /// Stable identifier of a conversation, unchanged across restarts.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct SessionKey(String);

    impl SessionKey {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Default for SessionKey {
        fn default() -> Self {
            Self::new("main")
        }
    }

    impl Display for SessionKey {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionKey {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionKey {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    /// Identifier of one send cycle. Unique per `send_message` call.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct RunId(String);

    impl RunId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn generate() -> Self {
            Self(uuid::Uuid::new_v4().to_string())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for RunId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for RunId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for RunId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub use context::{RunId, SessionKey};
pub use future::BoxFuture;

#[cfg(test)]
mod tests {
    use super::{RunId, SessionKey};

    #[test]
    fn id_newtypes_round_trip_strings() {
        let session = SessionKey::new("session-1");
        let run = RunId::from("run-1");

        assert_eq!(session.as_str(), "session-1");
        assert_eq!(run.as_str(), "run-1");
        assert_eq!(session.to_string(), "session-1");
        assert_eq!(run.to_string(), "run-1");
    }

    #[test]
    fn generated_run_ids_are_unique() {
        let first = RunId::generate();
        let second = RunId::generate();

        assert_ne!(first, second);
    }

    #[test]
    fn default_session_key_is_main() {
        assert_eq!(SessionKey::default().as_str(), "main");
    }
}
