//! Reactive Engine
//!
//! This module implements fine-grained dependency tracking between reactive
//! state reads and the computations that read them.
//!
//! # Concepts
//!
//! ## Stores
//!
//! A [`Store`] is a keyed record of mutable state. When a field is read
//! within a tracking context (an executing effect), the store automatically
//! registers that effect as a subscriber of the `(store, key)` pair. When
//! the field is written, every subscriber is notified.
//!
//! ## Effects
//!
//! A [`ReactiveEffect`] is a re-runnable computation. While it executes, any
//! store field it reads attaches the effect to that field's dependency set.
//! A later write to the field re-runs the effect, either synchronously or
//! through a caller-supplied scheduler callback.
//!
//! ## Deps
//!
//! A [`Dep`] is the set of effects subscribed to one observed field. Deps
//! live in a process-wide registry, created lazily on first tracked read.
//!
//! # Implementation Notes
//!
//! Tracking uses a thread-local stack of active effects. Entering a run
//! pushes the effect; leaving (including by panic) pops it and restores the
//! previous one, so nested effects track correctly. Before each re-run an
//! effect removes itself from every Dep it joined on the previous run and
//! rebuilds its memberships from scratch, so conditional reads never leave
//! stale subscriptions behind.
//!
//! This approach (sometimes called "automatic dependency tracking") is used
//! by SolidJS, Vue 3, and Leptos.

mod context;
mod dep;
mod effect;
mod registry;
mod store;

pub use context::{current_effect, is_tracking};
pub use dep::Dep;
pub use effect::{effect, effect_with, EffectId, EffectOptions, ReactiveEffect, Scheduler};
pub use registry::{track, trigger, ObjectId};
pub use store::{reactive, reactive_of, readonly, Store, StoreError};
