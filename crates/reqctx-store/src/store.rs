//! RequestContextStore — request id → bag of named values.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::dump::{DumpEntry, DumpSink};
use crate::error::StoreError;
use crate::scope::RequestScope;

/// Per-request key/value mapping. Only ever handed out as an owned copy.
pub type Bag = HashMap<String, Value>;

/// Two-level map of request id → bag, guarded by a single lock.
///
/// Mutations (`set`, `delete`, `clear`) take the write lock; every read
/// takes the read lock and copies what it returns before releasing it, so
/// callers never hold a reference into a bag.
///
/// Uses parking_lot::RwLock (sync) so the store can be used from plain
/// threads and from async handlers alike. No operation does I/O or awaits
/// while the lock is held.
pub struct RequestContextStore {
    data: RwLock<HashMap<String, Bag>>,
    config: StoreConfig,
}

impl RequestContextStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            data: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Store `value` under `key` for `id`, creating the bag if absent.
    /// Overwrites any previous value for that key.
    pub fn set(&self, id: &str, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let created = {
            let mut data = self.data.write();
            let created = !data.contains_key(id);
            data.entry(id.to_string())
                .or_insert_with(|| HashMap::with_capacity(self.config.bag_capacity))
                .insert(key.to_string(), value);
            created
        };
        // Logged after the guard is released.
        if created {
            trace!("Request context created: {id}");
        }
    }

    /// Serialize `value` (outside the lock) and store it under `key`.
    pub fn set_serialized<T: Serialize + ?Sized>(
        &self,
        id: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(id, key, value);
        Ok(())
    }

    /// Value for `(id, key)`, or `Value::Null` when either is absent.
    ///
    /// A key explicitly set to `Value::Null` looks the same as a missing
    /// one; use [`get_ok`](Self::get_ok) to tell them apart.
    pub fn get(&self, id: &str, key: &str) -> Value {
        self.get_ok(id, key).unwrap_or(Value::Null)
    }

    /// Value for `(id, key)` with explicit presence.
    ///
    /// `None` means the key was never set (or the id is unknown);
    /// `Some(Value::Null)` means it was set to null.
    pub fn get_ok(&self, id: &str, key: &str) -> Option<Value> {
        self.data.read().get(id)?.get(key).cloned()
    }

    /// Decode the value for `(id, key)` as `T`.
    ///
    /// The caller names the type it stored; a mismatch surfaces as
    /// [`StoreError::Decode`]. Absence is `Ok(None)`.
    pub fn get_as<T: DeserializeOwned>(&self, id: &str, key: &str) -> Result<Option<T>, StoreError> {
        let Some(value) = self.get_ok(id, key) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
                source,
            })
    }

    /// Copy of the whole bag for `id`, or `None` if the id is unknown.
    pub fn get_all(&self, id: &str) -> Option<Bag> {
        self.data.read().get(id).cloned()
    }

    /// Copy of the bag for `id` plus whether the id is known.
    ///
    /// An unknown id yields an empty map and `false`; check the flag, not
    /// the emptiness of the map.
    pub fn get_all_ok(&self, id: &str) -> (Bag, bool) {
        match self.data.read().get(id) {
            Some(bag) => (bag.clone(), true),
            None => (Bag::new(), false),
        }
    }

    /// Remove `key` from the bag for `id`. No-op if either is absent.
    /// The bag itself stays until [`clear`](Self::clear).
    pub fn delete(&self, id: &str, key: &str) {
        let mut data = self.data.write();
        if let Some(bag) = data.get_mut(id) {
            bag.remove(key);
        }
    }

    /// Remove the whole bag for `id`. Idempotent.
    ///
    /// This is the end-of-request hook: every id that ever had `set` called
    /// on it must be cleared exactly once, or its bag lives for the rest of
    /// the process.
    pub fn clear(&self, id: &str) {
        let removed = self.data.write().remove(id);
        if let Some(bag) = removed {
            debug!("Request context cleared: {id} ({} keys)", bag.len());
        }
    }

    /// Whether a bag exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.data.read().contains_key(id)
    }

    /// Number of request ids currently holding a bag.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Request ids currently holding a bag, sorted.
    pub fn request_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.data.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Bind a [`RequestScope`] to `id`; the bag is cleared when it drops.
    pub fn scope(self: &Arc<Self>, id: impl Into<String>) -> RequestScope {
        RequestScope::new(Arc::clone(self), id)
    }

    // ── Diagnostics ───────────────────────────────────────────────────────

    /// Snapshot of one bag, sorted by key. Empty for an unknown id.
    pub fn dump(&self, id: &str) -> Vec<DumpEntry> {
        let mut entries: Vec<DumpEntry> = {
            let data = self.data.read();
            match data.get(id) {
                Some(bag) => bag
                    .iter()
                    .map(|(key, value)| DumpEntry::new(id, key, value.clone()))
                    .collect(),
                None => Vec::new(),
            }
        };
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Snapshot of every bag, sorted by request id then key.
    pub fn dump_all(&self) -> Vec<DumpEntry> {
        let mut entries: Vec<DumpEntry> = {
            let data = self.data.read();
            data.iter()
                .flat_map(|(id, bag)| {
                    bag.iter()
                        .map(move |(key, value)| DumpEntry::new(id, key, value.clone()))
                })
                .collect()
        };
        entries.sort_by(|a, b| {
            a.request_id
                .cmp(&b.request_id)
                .then_with(|| a.key.cmp(&b.key))
        });
        entries
    }

    /// Emit the snapshot of one bag to `sink`. Returns the entry count.
    pub fn print_data(&self, id: &str, sink: &mut dyn DumpSink) -> Result<usize, StoreError> {
        emit_all(self.dump(id), sink)
    }

    /// Emit the snapshot of every bag to `sink`. Returns the entry count.
    pub fn print_all(&self, sink: &mut dyn DumpSink) -> Result<usize, StoreError> {
        emit_all(self.dump_all(), sink)
    }
}

impl Default for RequestContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContextStore")
            .field("requests", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

// Runs after the read lock is released.
fn emit_all(entries: Vec<DumpEntry>, sink: &mut dyn DumpSink) -> Result<usize, StoreError> {
    for entry in &entries {
        sink.emit(entry)?;
    }
    sink.flush()?;
    Ok(entries.len())
}
