use std::fs;

use tempfile::TempDir;

use super::*;

#[test]
fn test_store_path_under_dot_config() {
    let path = store_path().unwrap();
    assert!(path.to_string_lossy().contains(".config/writeup"));
    assert!(path.to_string_lossy().ends_with("store.json"));
}

#[test]
fn test_memory_store_round_trip() {
    let mut store = MemoryStore::new();
    assert!(store.get("k").is_none());
    store.set("k", "v".to_string()).unwrap();
    assert_eq!(store.get("k"), Some("v".to_string()));
}

#[test]
fn test_initial_text_prefers_saved_document() {
    let mut store = MemoryStore::new();
    save_document(&mut store, "Where I left off").unwrap();
    assert_eq!(initial_text(&store), "Where I left off");
}

#[test]
fn test_initial_text_seeds_starter_prompt() {
    let store = MemoryStore::new();
    let text = initial_text(&store);
    assert!(STARTER_PROMPTS.contains(&text.as_str()));
}

#[test]
fn test_unreadable_document_is_ignored() {
    let mut store = MemoryStore::new();
    store.set(DOCUMENT_KEY, "{broken".to_string()).unwrap();
    assert!(load_document(&store).is_none());
    assert!(STARTER_PROMPTS.contains(&initial_text(&store).as_str()));
}

#[test]
fn test_saved_document_has_timestamp() {
    let mut store = MemoryStore::new();
    let before = Utc::now();
    save_document(&mut store, "text").unwrap();
    let doc = load_document(&store).unwrap();
    assert_eq!(doc.text, "text");
    assert!(doc.saved_at >= before);
}

#[test]
fn test_file_store_persists_across_opens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("store.json");

    let mut store = FileStore::open(&path);
    save_document(&mut store, "Chapter one ").unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = FileStore::open(&path);
    assert_eq!(reopened.path(), path.as_path());
    assert_eq!(initial_text(&reopened), "Chapter one ");
}

#[test]
fn test_file_store_corrupt_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.json");
    fs::write(&path, "not json").unwrap();

    let store = FileStore::open(&path);
    assert!(store.get(DOCUMENT_KEY).is_none());
}
