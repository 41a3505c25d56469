//! Reactive Stores
//!
//! A [`Store`] wraps one keyed record of state so that field reads invoke
//! tracking and field writes invoke notification. It is the transparent
//! facade over plain data that the rest of the engine observes.
//!
//! # How Stores Work
//!
//! 1. `get` reads the underlying field, then records a track event for
//!    `(store, key)` against the currently executing effect.
//!
//! 2. `set` writes the underlying field, then fires a trigger event for
//!    `(store, key)`, notifying every subscribed effect synchronously in
//!    the writer's own call stack.
//!
//! 3. Read-only stores reject writes and never trigger.
//!
//! # Identity
//!
//! Wrapping is identity-stable: a process-wide cache of weakly-held store
//! inners guarantees that retrieving a store by id yields a handle sharing
//! the same inner, and `Store` equality is inner-pointer equality. The
//! cache holds only weak references, so observing a record never keeps it
//! alive; dropping the last handle removes both the cache entry and the
//! record's tracking state.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use super::registry::{self, ObjectId};

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write was attempted on a read-only store.
    #[error("write to read-only store rejected: {key}")]
    ReadonlyWrite { key: String },
}

struct StoreInner {
    id: ObjectId,
    fields: RwLock<IndexMap<String, Value>>,
    readonly: bool,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        registry::forget_target(self.id);
        store_cache().remove(&self.id);
    }
}

static STORE_CACHE: OnceLock<DashMap<ObjectId, Weak<StoreInner>>> = OnceLock::new();

fn store_cache() -> &'static DashMap<ObjectId, Weak<StoreInner>> {
    STORE_CACHE.get_or_init(DashMap::new)
}

/// A reactive record of `key -> value` fields.
///
/// `Store` is a cheap-clone handle; clones share the same underlying record
/// and identity. Two handles are equal iff they wrap the same record.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    fn create(fields: IndexMap<String, Value>, readonly: bool) -> Self {
        let inner = Arc::new(StoreInner {
            id: ObjectId::next(),
            fields: RwLock::new(fields),
            readonly,
        });
        store_cache().insert(inner.id, Arc::downgrade(&inner));
        Self { inner }
    }

    /// The store's object ID, as used by the tracking registry.
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// Whether writes are rejected.
    pub fn is_readonly(&self) -> bool {
        self.inner.readonly
    }

    /// Read a field, registering the currently executing effect as a
    /// subscriber of `(store, key)`.
    ///
    /// Absent keys are tracked too: an effect that observed a missing field
    /// re-runs when the field is later inserted.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = {
            let fields = self.inner.fields.read().expect("fields lock poisoned");
            fields.get(key).cloned()
        };
        if !self.inner.readonly {
            registry::track(self.inner.id, key);
        }
        value
    }

    /// Read a field without establishing a reactive dependency.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.inner
            .fields
            .read()
            .expect("fields lock poisoned")
            .get(key)
            .cloned()
    }

    /// Write a field, then notify every effect subscribed to
    /// `(store, key)`.
    ///
    /// There is no equality short-circuit: reassigning an equal value still
    /// triggers. Writes to read-only stores are rejected.
    pub fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.inner.readonly {
            return Err(StoreError::ReadonlyWrite {
                key: key.to_string(),
            });
        }

        {
            let mut fields = self.inner.fields.write().expect("fields lock poisoned");
            fields.insert(key.to_string(), value);
        }

        trace!(store = ?self.inner.id, key, "field written");
        registry::trigger(self.inner.id, key);
        Ok(())
    }

    /// Update a field from its current value.
    pub fn update<F>(&self, key: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let next = {
            let fields = self.inner.fields.read().expect("fields lock poisoned");
            f(fields.get(key))
        };
        self.set(key, next)
    }

    /// Number of fields currently in the record.
    pub fn len(&self) -> usize {
        self.inner.fields.read().expect("fields lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the store for an id, if the record is still alive.
    ///
    /// This is the identity cache: the returned handle shares the inner of
    /// every other handle to the same record.
    pub fn retrieve(id: ObjectId) -> Option<Store> {
        let weak = store_cache().get(&id)?;
        weak.upgrade().map(|inner| Store { inner })
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Store {}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("readonly", &self.inner.readonly)
            .field("len", &self.len())
            .finish()
    }
}

/// Wrap a record of fields in a reactive store.
///
/// Wrapping an existing store's handle is identity-preserving: `clone` (or
/// [`Store::retrieve`] by id) yields a handle equal to the original. A
/// read-only store passed through [`reactive_of`] is returned unchanged.
pub fn reactive(fields: IndexMap<String, Value>) -> Store {
    Store::create(fields, false)
}

/// Wrap a record of fields in a read-only store. Writes are rejected with
/// [`StoreError::ReadonlyWrite`] and never trigger.
pub fn readonly(fields: IndexMap<String, Value>) -> Store {
    Store::create(fields, true)
}

/// Re-wrap an existing store.
///
/// Returns a handle sharing the same underlying record. A read-only store
/// passes through unchanged.
pub fn reactive_of(store: &Store) -> Store {
    store.clone()
}
