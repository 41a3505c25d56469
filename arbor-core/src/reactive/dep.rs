//! Dependency Sets
//!
//! A [`Dep`] is the set of effects subscribed to one observed
//! `(object, key)` pair. Deps are owned by the tracking registry and shared
//! by every effect that has read that pair.
//!
//! Membership is held weakly: a Dep never keeps a dropped effect alive, and
//! dead entries are pruned whenever the set is snapshotted or mutated.
//!
//! Notification iterates over a snapshot taken at trigger time, never the
//! live set. An effect that re-tracks (or removes itself) while being
//! notified would otherwise invalidate the iteration.

use std::sync::{RwLock, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::effect::{EffectId, EffectInner, ReactiveEffect};

/// The set of effects subscribed to one observed field.
///
/// Insertion order is preserved, so notification order follows membership
/// order.
#[derive(Default)]
pub struct Dep {
    subscribers: RwLock<IndexMap<EffectId, Weak<EffectInner>>>,
}

impl Dep {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add an effect to this Dep. Adding an already-present effect is a
    /// no-op.
    pub(crate) fn add(&self, effect: &ReactiveEffect) {
        self.subscribers
            .write()
            .expect("subscribers lock poisoned")
            .insert(effect.id(), effect.downgrade());
    }

    /// Remove an effect by id.
    pub(crate) fn remove(&self, id: EffectId) {
        self.subscribers
            .write()
            .expect("subscribers lock poisoned")
            .shift_remove(&id);
    }

    /// Take a stable snapshot of the live membership, in insertion order.
    ///
    /// Dead entries encountered along the way are pruned afterwards.
    pub(crate) fn snapshot(&self) -> SmallVec<[ReactiveEffect; 4]> {
        let mut live: SmallVec<[ReactiveEffect; 4]> = SmallVec::new();
        let mut dead: SmallVec<[EffectId; 4]> = SmallVec::new();

        {
            let subscribers = self.subscribers.read().expect("subscribers lock poisoned");
            for (id, weak) in subscribers.iter() {
                match weak.upgrade() {
                    Some(inner) => live.push(ReactiveEffect::from_inner(inner)),
                    None => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().expect("subscribers lock poisoned");
            for id in dead {
                subscribers.shift_remove(&id);
            }
        }

        live
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscribers lock poisoned")
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
