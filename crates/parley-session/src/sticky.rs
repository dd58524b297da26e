//! Per-conversation sticky errors that survive restarts.
//!
//! The ledger is best-effort: every operation is total, and persistence
//! failures are logged and swallowed.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Fixed key the ledger blob is stored under
pub const STORAGE_KEY: &str = "chat_sticky_errors";

/// Last fatal error recorded for a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickyError {
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl StickyError {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Key-value ledger of sticky errors by conversation id
pub trait StickyErrorStore: Send + Sync {
    /// Full entry for a conversation
    fn entry(&self, conversation_id: &str) -> Option<StickyError>;

    /// Record an error, overwriting any previous one for the conversation
    fn put(&self, conversation_id: &str, content: &str);

    /// Forget the conversation's error
    fn remove(&self, conversation_id: &str);

    /// Error content for a conversation
    fn get(&self, conversation_id: &str) -> Option<String> {
        self.entry(conversation_id).map(|e| e.content)
    }
}

type Ledger = HashMap<String, StickyError>;

/// Process-local store, lost on exit
#[derive(Default)]
pub struct MemoryStickyErrors {
    entries: Mutex<Ledger>,
}

impl MemoryStickyErrors {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StickyErrorStore for MemoryStickyErrors {
    fn entry(&self, conversation_id: &str) -> Option<StickyError> {
        self.entries.lock().get(conversation_id).cloned()
    }

    fn put(&self, conversation_id: &str, content: &str) {
        self.entries
            .lock()
            .insert(conversation_id.to_string(), StickyError::new(content));
    }

    fn remove(&self, conversation_id: &str) {
        self.entries.lock().remove(conversation_id);
    }
}

/// Store backed by a single JSON file holding the whole ledger
pub struct JsonFileStickyErrors {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileStickyErrors {
    /// Store the ledger under `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
            lock: Mutex::new(()),
        }
    }

    /// Default ledger directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Ledger {
        if !self.path.exists() {
            return Ledger::new();
        }
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    "Ignoring corrupt sticky error ledger {}: {}",
                    self.path.display(),
                    e
                );
                Ledger::new()
            }),
            Err(e) => {
                tracing::warn!(
                    "Failed to read sticky error ledger {}: {}",
                    self.path.display(),
                    e
                );
                Ledger::new()
            }
        }
    }

    fn save(&self, ledger: &Ledger) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string(ledger)?;

        // Replace the ledger in one step so a crash never leaves it half written
        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp_file = fs::File::create(&tmp_path)?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(&tmp_path, &self.path)
    }

    /// Read-modify-write under one lock span. `f` returns false to skip the write.
    fn update(&self, op: &str, f: impl FnOnce(&mut Ledger) -> bool) {
        let _guard = self.lock.lock();
        let mut ledger = self.load();
        if !f(&mut ledger) {
            return;
        }
        if let Err(e) = self.save(&ledger) {
            tracing::warn!(
                "Failed to {} sticky error in {}: {}",
                op,
                self.path.display(),
                e
            );
        }
    }
}

impl StickyErrorStore for JsonFileStickyErrors {
    fn entry(&self, conversation_id: &str) -> Option<StickyError> {
        let _guard = self.lock.lock();
        self.load().remove(conversation_id)
    }

    fn put(&self, conversation_id: &str, content: &str) {
        self.update("store", |ledger| {
            ledger.insert(conversation_id.to_string(), StickyError::new(content));
            true
        });
    }

    fn remove(&self, conversation_id: &str) {
        self.update("remove", |ledger| ledger.remove(conversation_id).is_some());
    }
}
