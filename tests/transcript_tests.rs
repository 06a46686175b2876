// Tests for the transcript persistence collaborator.

use voice_relay::transcript::{ChatMessage, JsonFileStore, MemoryStore, Role, TranscriptStore};

#[test]
fn test_file_store_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("chat_transcript.json")).unwrap();

    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_append_preserves_arrival_order_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_transcript.json");

    {
        let store = JsonFileStore::open(&path).unwrap();
        store.append(ChatMessage::user("first")).unwrap();
        store.append(ChatMessage::bot("second")).unwrap();
        store.append(ChatMessage::user("third")).unwrap();
    }

    // Fresh open reads the log back from disk
    let store = JsonFileStore::open(&path).unwrap();
    let log = store.load().unwrap();

    assert_eq!(log.len(), 3);
    assert_eq!(log[0].role, Role::User);
    assert_eq!(log[0].content, "first");
    assert_eq!(log[1].role, Role::Bot);
    assert_eq!(log[1].content, "second");
    assert_eq!(log[2].content, "third");
}

#[test]
fn test_clear_removes_persisted_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_transcript.json");

    let store = JsonFileStore::open(&path).unwrap();
    store.append(ChatMessage::user("hello")).unwrap();
    assert!(path.exists());

    store.clear().unwrap();
    assert!(!path.exists());
    assert!(store.load().unwrap().is_empty());

    // Reopen also sees nothing
    let store = JsonFileStore::open(&path).unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_clear_on_empty_store_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("chat_transcript.json")).unwrap();

    store.clear().unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    store.append(ChatMessage::user("u")).unwrap();
    store.append(ChatMessage::bot("b")).unwrap();

    let log = store.load().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].role, Role::User);
    assert_eq!(log[1].role, Role::Bot);

    store.clear().unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_messages_serialize_with_lowercase_roles() {
    let msg = ChatMessage::bot("hi");
    let raw = serde_json::to_string(&msg).unwrap();
    assert!(raw.contains(r#""role":"bot""#));

    let parsed: ChatMessage = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.role, Role::Bot);
    assert_eq!(parsed.content, "hi");
}
