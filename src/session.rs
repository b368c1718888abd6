//! Session record over key-value storage.
//!
//! The host page owns the actual storage (browser `localStorage` or
//! equivalent); this module only defines the seam and the load-or-create
//! logic on top of it.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_ID_KEY: &str = "truffle_session_id";
pub const FIRST_SEEN_KEY: &str = "truffle_first_seen";
pub const LAST_SEEN_KEY: &str = "truffle_last_seen";

/// Minimal key-value storage seam. Implemented by the host; [`MemoryStore`]
/// covers native use and tests.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("kv poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("kv poisoned")
            .insert(key.to_string(), value.to_string());
    }
}

/// Per-visitor session identity, persisted across page loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// RFC 3339, set on the first visit and never changed after.
    pub first_seen: String,
    /// RFC 3339, rewritten on every load.
    pub last_seen: String,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl SessionRecord {
    /// Load the stored session, creating the id and first-seen timestamp on
    /// the first visit. The last-seen timestamp is always rewritten to now.
    ///
    /// A stored id that is empty or whitespace is treated as absent and
    /// replaced.
    pub fn load_or_create(store: &dyn KvStore) -> Self {
        let id = match store.get(SESSION_ID_KEY) {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                let id = Uuid::new_v4().to_string();
                store.set(SESSION_ID_KEY, &id);
                id
            }
        };

        let first_seen = match store.get(FIRST_SEEN_KEY) {
            Some(ts) if !ts.trim().is_empty() => ts,
            _ => {
                let ts = now_rfc3339();
                store.set(FIRST_SEEN_KEY, &ts);
                ts
            }
        };

        let last_seen = now_rfc3339();
        store.set(LAST_SEEN_KEY, &last_seen);

        SessionRecord {
            id,
            first_seen,
            last_seen,
        }
    }
}
