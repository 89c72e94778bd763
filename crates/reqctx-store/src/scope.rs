//! RequestScope — binds one request id to the store and clears it on drop.
//!
//! Dropping the scope runs `clear` on every exit path of the request:
//! normal return, early return, `?`, panic unwind, or a cancelled future.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{Bag, RequestContextStore};

pub struct RequestScope {
    store: Arc<RequestContextStore>,
    id: String,
}

impl RequestScope {
    pub fn new(store: Arc<RequestContextStore>, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }

    /// Scope for a freshly generated (uuid v4) request id.
    pub fn generate(store: Arc<RequestContextStore>) -> Self {
        Self::new(store, uuid::Uuid::new_v4().to_string())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<RequestContextStore> {
        &self.store
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.store.set(&self.id, key, value);
    }

    pub fn set_serialized<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.store.set_serialized(&self.id, key, value)
    }

    pub fn get(&self, key: &str) -> Value {
        self.store.get(&self.id, key)
    }

    pub fn get_ok(&self, key: &str) -> Option<Value> {
        self.store.get_ok(&self.id, key)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.store.get_as(&self.id, key)
    }

    pub fn get_all(&self) -> Option<Bag> {
        self.store.get_all(&self.id)
    }

    pub fn delete(&self, key: &str) {
        self.store.delete(&self.id, key);
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.store.clear(&self.id);
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope").field("id", &self.id).finish()
    }
}
