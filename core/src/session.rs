//! Session token storage.
//!
//! # Design
//! The client never caches the token: it asks the store on every request, so
//! a login or logout is visible to the next call made from anywhere in the
//! process. Stores hold exactly one slot, `TOKEN_KEY`.
//!
//! Store operations never fail. A store that cannot read its backing medium
//! reports "no token"; one that cannot write logs and moves on.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

/// Name of the slot holding the bearer token.
pub const TOKEN_KEY: &str = "petpulse_token";

/// Single-slot storage for the session token.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<String>;

    /// Store `token`, replacing any previous value.
    fn set(&self, token: &str);

    fn clear(&self);
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: RwLock::new(Some(token.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<String> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, token: &str) {
        let mut slot = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(token.to_string());
    }

    fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }
}

/// Durable store backed by a JSON object file.
///
/// The token lives under [`TOKEN_KEY`]; any other keys in the file are left
/// untouched. The file is read on every `get`, so several processes sharing
/// one profile see each other's logins.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<data dir>/petpulse/session.json`, or `None` when the platform has
    /// no data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("petpulse").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> BTreeMap<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return BTreeMap::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read session file");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "session file is not a JSON object");
                BTreeMap::new()
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %err, "failed to create session directory");
                return;
            }
        }
        let encoded = match serde_json::to_string_pretty(entries) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "failed to encode session file");
                return;
            }
        };
        // Write then rename so readers never observe a truncated file.
        let staging = self.path.with_extension("json.tmp");
        let result = fs::write(&staging, encoded).and_then(|()| fs::rename(&staging, &self.path));
        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "failed to write session file");
        }
    }

    fn update(&self, token: Option<&str>) {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.read_entries();
        match token {
            Some(token) => {
                entries.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
            }
            None => {
                if entries.remove(TOKEN_KEY).is_none() {
                    return;
                }
            }
        }
        self.write_entries(&entries);
        debug!(path = %self.path.display(), stored = token.is_some(), "session file updated");
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<String> {
        match self.read_entries().remove(TOKEN_KEY) {
            Some(Value::String(token)) if !token.is_empty() => Some(token),
            _ => None,
        }
    }

    fn set(&self, token: &str) {
        self.update(Some(token));
    }

    fn clear(&self) {
        self.update(None);
    }
}
