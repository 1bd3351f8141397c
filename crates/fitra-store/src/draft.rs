//! Keyed local draft store.
//!
//! [`DraftStore`] addresses a [`KeyValueStore`] by [`DraftKey`] and never
//! fails: unavailable backends and unparsable values read as absent and
//! write failures are logged and dropped.
//!
//! [`RestoredSlot`] holds one key's value in memory and persists it only
//! after the initial load has resolved, so defaults written before
//! restoration cannot clobber stored state.

use std::sync::Arc;

use fitra_core::DraftKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::KeyValueStore;

#[derive(Clone)]
pub struct DraftStore {
    backend: Arc<dyn KeyValueStore>,
}

impl DraftStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load the value stored for `key`, or `None` if absent or unreadable.
    pub fn load<T: DeserializeOwned>(&self, key: &DraftKey) -> Option<T> {
        let storage_key = key.storage_key();
        let raw = match self.backend.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "draft storage unavailable, treating as absent");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "stored draft unparsable, treating as absent");
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: &DraftKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize draft");
                return;
            }
        };
        if let Err(e) = self.backend.set(&key.storage_key(), &json) {
            warn!(key = %key, error = %e, "failed to persist draft");
        }
    }

    pub fn remove(&self, key: &DraftKey) {
        if let Err(e) = self.backend.remove(&key.storage_key()) {
            warn!(key = %key, error = %e, "failed to remove draft");
        }
    }
}

/// One key's value, mirrored to a [`DraftStore`] once restored.
pub struct RestoredSlot<T> {
    store: DraftStore,
    key: DraftKey,
    initial: T,
    value: T,
    restored: bool,
}

impl<T> RestoredSlot<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    /// Start unrestored, holding `initial`.
    pub fn new(store: DraftStore, key: DraftKey, initial: T) -> Self {
        Self {
            store,
            key,
            value: initial.clone(),
            initial,
            restored: false,
        }
    }

    /// Run the initial load. A stored value replaces the in-memory one;
    /// otherwise the in-memory value (including edits made while
    /// unrestored) is written back.
    ///
    /// Flips the restored flag exactly once, whether or not the load found
    /// anything. Later calls are no-ops and return `false`.
    pub fn restore(&mut self) -> bool {
        if self.restored {
            return false;
        }
        let found = match self.store.load::<T>(&self.key) {
            Some(stored) => {
                self.value = stored;
                true
            }
            None => false,
        };
        self.restored = true;
        debug!(key = %self.key, found, "draft slot restored");
        if !found {
            self.persist();
        }
        found
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Replace the value. Persisted only once restored.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.persist();
    }

    /// Mutate the value in place. Persisted only once restored.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.persist();
    }

    /// Rewrite the value through `f`. Persisted (once restored) only when
    /// `f` actually changed it.
    pub fn normalize(&mut self, f: impl FnOnce(T) -> T) {
        let next = f(self.value.clone());
        if next != self.value {
            self.value = next;
            self.persist();
        }
    }

    /// Delete the stored value and return to the initial value.
    pub fn remove(&mut self) {
        self.store.remove(&self.key);
        self.value = self.initial.clone();
    }

    fn persist(&self) {
        if self.restored {
            self.store.save(&self.key, &self.value);
        } else {
            debug!(key = %self.key, "write before restoration not persisted");
        }
    }
}
