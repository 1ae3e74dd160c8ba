use std::fs;
use std::time::{Duration, UNIX_EPOCH};

use fcommon::SessionKey;
use fmemory::{
    ChatMessage, FilesystemSessionBackend, Session, SessionBackend, SessionStore, ThinkingLevel,
};

fn session_at(key: &str, millis: u64, messages: &[&str]) -> Session {
    let mut session = Session::new(SessionKey::from(key));
    session.updated_at = UNIX_EPOCH + Duration::from_millis(millis);
    session.messages = messages.iter().map(|text| ChatMessage::user(*text)).collect();
    session
}

#[test]
fn sessions_survive_a_restart_with_identical_messages() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let key = SessionKey::from("agent:main");

    let written = {
        let store = SessionStore::open(dir.path()).expect("store should open");
        store.append(&key, ChatMessage::user("what is rust?"));
        store.append(&key, ChatMessage::assistant("a systems language"));
        store.rename(&key, Some("Rust questions"));
        let write = store.set_thinking_level(&key, "Medium");
        assert!(write.is_persisted());
        write.session
    };

    let reopened = SessionStore::open(dir.path()).expect("store should reopen");
    let loaded = reopened.get_or_create(&key);

    assert_eq!(loaded.messages, written.messages);
    assert_eq!(loaded.thinking_level, ThinkingLevel::Medium);
    assert_eq!(loaded.display_name.as_deref(), Some("Rust questions"));
    assert_eq!(loaded.updated_at, written.updated_at);
}

#[test]
fn corrupt_record_yields_a_fresh_session() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let backend = FilesystemSessionBackend::new(dir.path()).expect("backend should open");
    let key = SessionKey::from("main");
    fs::write(backend.record_path(&key), b"{ not json").expect("corrupt file should write");

    let store = SessionStore::open(dir.path()).expect("store should open");
    let session = store.get_or_create(&key);
    assert!(session.messages.is_empty());

    let write = store.append(&key, ChatMessage::user("starting over"));
    assert!(write.is_persisted());
    assert_eq!(
        backend.load(&key).expect("record should be rewritten").messages.len(),
        1
    );
}

#[test]
fn list_skips_unreadable_records_and_orders_by_recency_then_key() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let backend = FilesystemSessionBackend::new(dir.path()).expect("backend should open");
    backend
        .save(&session_at("older", 1_000, &["a"]))
        .expect("save should work");
    backend
        .save(&session_at("tie-b", 5_000, &["b"]))
        .expect("save should work");
    backend
        .save(&session_at("tie-a", 5_000, &["c"]))
        .expect("save should work");
    fs::write(dir.path().join("garbage.json"), b"[]").expect("garbage should write");
    fs::write(dir.path().join("notes.txt"), b"ignored").expect("notes should write");

    let store = SessionStore::open(dir.path()).expect("store should open");
    let listed_keys = || {
        store
            .list()
            .into_iter()
            .map(|session| session.key.to_string())
            .collect::<Vec<_>>()
    };

    assert_eq!(listed_keys(), vec!["tie-a", "tie-b", "older"]);
    assert_eq!(listed_keys(), listed_keys());
}

#[test]
fn freshly_written_sessions_lead_the_listing() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let backend = FilesystemSessionBackend::new(dir.path()).expect("backend should open");
    backend
        .save(&session_at("archived", 1_000, &["old"]))
        .expect("save should work");

    let store = SessionStore::open(dir.path()).expect("store should open");
    store.append(&SessionKey::from("today"), ChatMessage::user("new"));

    let summaries = store.summaries(10);
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].key.as_str(), "today");
    assert_eq!(summaries[0].last_message_preview.as_deref(), Some("new"));
    assert_eq!(summaries[1].key.as_str(), "archived");

    assert_eq!(store.summaries(1).len(), 1);
}

#[test]
fn keys_with_unsafe_characters_do_not_collide() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let store = SessionStore::open(dir.path()).expect("store should open");
    let colon = SessionKey::from("agent:main");
    let slash = SessionKey::from("agent/main");

    store.append(&colon, ChatMessage::user("colon"));
    store.append(&slash, ChatMessage::user("slash"));

    let reopened = SessionStore::open(dir.path()).expect("store should reopen");
    assert_eq!(reopened.get_or_create(&colon).messages[0].content, "colon");
    assert_eq!(reopened.get_or_create(&slash).messages[0].content, "slash");
    assert_eq!(reopened.list().len(), 2);
}

#[test]
fn cleared_sessions_stay_on_disk() {
    let dir = tempfile::tempdir().expect("temp dir should exist");
    let key = SessionKey::from("main");
    {
        let store = SessionStore::open(dir.path()).expect("store should open");
        store.append(&key, ChatMessage::user("hello"));
        store.clear(&key);
    }

    let reopened = SessionStore::open(dir.path()).expect("store should reopen");
    let listed = reopened.list();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].messages.is_empty());
}
