//! Tracking Registry
//!
//! The registry is the process-wide mapping from observed object to field
//! key to [`Dep`]. It is populated lazily: a Dep exists for `(object, key)`
//! iff some effect has read that field while tracking was active.
//!
//! The registry is keyed by [`ObjectId`], not by the record itself, so it
//! never extends the observed record's lifetime. The store's inner `Drop`
//! calls [`forget_target`] to remove its entry once the last handle is
//! gone.
//!
//! # Locking discipline
//!
//! `trigger` clones the `Arc<Dep>` out of the registry and releases every
//! registry lock before running any effect. Effects re-enter `track` while
//! they run; holding a shard lock across that would deadlock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::trace;

use super::context;
use super::dep::Dep;

/// Unique identifier for an observed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Per-object map of field key to Dep, created lazily per key.
#[derive(Default)]
struct TargetDeps {
    keys: RwLock<IndexMap<String, Arc<Dep>>>,
}

static TARGETS: OnceLock<DashMap<ObjectId, TargetDeps>> = OnceLock::new();

fn targets() -> &'static DashMap<ObjectId, TargetDeps> {
    TARGETS.get_or_init(DashMap::new)
}

/// Record that the currently executing effect reads `(target, key)`.
///
/// No-op when no effect is executing (a read outside any tracked
/// computation). Adding an already-subscribed effect is a no-op as well.
pub fn track(target: ObjectId, key: &str) {
    let Some(effect) = context::current_effect() else {
        return;
    };

    let dep = {
        let entry = targets().entry(target).or_default();
        let mut keys = entry.keys.write().expect("keys lock poisoned");
        match keys.get(key) {
            Some(dep) => Arc::clone(dep),
            None => {
                let dep = Arc::new(Dep::new());
                keys.insert(key.to_string(), Arc::clone(&dep));
                dep
            }
        }
    };

    dep.add(&effect);
    effect.remember_dep(&dep);

    trace!(?target, key, effect = ?effect.id(), "tracked dependency");
}

/// Notify every effect subscribed to `(target, key)` that it changed.
///
/// No-op when the pair was never tracked. Each subscriber's scheduler is
/// invoked when present; otherwise the effect re-runs synchronously, in
/// membership order, on the caller's stack. The effect currently executing
/// is skipped so a computation that writes a field it also reads does not
/// recurse into itself.
pub fn trigger(target: ObjectId, key: &str) {
    let Some(dep) = lookup_dep(target, key) else {
        trace!(?target, key, "trigger on untracked field, ignoring");
        return;
    };

    let subscribers = dep.snapshot();
    trace!(?target, key, count = subscribers.len(), "triggering effects");

    for effect in subscribers {
        if context::is_current(&effect) {
            continue;
        }
        match effect.scheduler() {
            Some(scheduler) => scheduler(),
            None => effect.run(),
        }
    }
}

fn lookup_dep(target: ObjectId, key: &str) -> Option<Arc<Dep>> {
    let entry = targets().get(&target)?;
    let keys = entry.keys.read().expect("keys lock poisoned");
    keys.get(key).cloned()
}

/// Drop all tracking state for an object.
///
/// Called when the last handle to an observed record is dropped.
pub(crate) fn forget_target(target: ObjectId) {
    targets().remove(&target);
}
