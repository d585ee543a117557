//! Session document persistence
//!
//! The document survives between sessions in a small key-value store. It is
//! read once when a session starts and written once when it ends.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR: &str = "writeup";
const STORE_FILE: &str = "store.json";

/// Key the document is kept under
pub const DOCUMENT_KEY: &str = "content";

/// Openers offered to a writer with nothing saved yet
pub const STARTER_PROMPTS: &[&str] = &[
    "The software innovations in the 20th century ",
    "Climate change has ",
    "The breakthrough in ",
    "Cancer research has revolutionized ",
    "Recent developments in ",
    "BANG! The earthquake shattered ",
    "We know now that ",
    "Nikola Tesla's inventions have ",
    "We must take action! ",
    "SpaceX's recent landing ",
    "I had my first ",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

/// The stored form of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedDocument {
    pub text: String,
    pub saved_at: DateTime<Utc>,
}

/// Load the saved document, if there is a readable one
pub fn load_document(store: &dyn KeyValueStore) -> Option<SavedDocument> {
    let raw = store.get(DOCUMENT_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            log::debug!("Ignoring unreadable saved document: {}", e);
            None
        }
    }
}

pub fn save_document(store: &mut dyn KeyValueStore, text: &str) -> Result<(), StoreError> {
    let doc = SavedDocument {
        text: text.to_string(),
        saved_at: Utc::now(),
    };
    store.set(DOCUMENT_KEY, serde_json::to_string(&doc)?)
}

/// Text to open a session with: the saved document, or a random opener
pub fn initial_text(store: &dyn KeyValueStore) -> String {
    match load_document(store) {
        Some(doc) => doc.text,
        None => STARTER_PROMPTS
            .choose(&mut rand::thread_rng())
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}

/// In-memory store, nothing persisted
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// A JSON object on disk
///
/// Loaded eagerly; every `set` rewrites the file through a temporary file
/// and a rename so a crash never leaves it half written.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

pub fn store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config").join(CONFIG_DIR).join(STORE_FILE))
}

impl FileStore {
    /// Open the store at `path`; a missing or unreadable file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
