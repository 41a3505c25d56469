//! Reactive Effects
//!
//! An effect is a re-runnable computation. While it executes, every store
//! field it reads registers the effect as a subscriber; a later write to any
//! of those fields re-runs it.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its closure immediately (unless lazy)
//!    to establish initial dependencies.
//!
//! 2. When a dependency changes, the effect re-runs synchronously inside
//!    the write, or its scheduler callback is invoked instead when one was
//!    supplied. The scheduler owns timing from that point on.
//!
//! 3. Before re-running, the effect removes itself from every Dep it joined
//!    on the previous run and rebuilds its memberships during execution.
//!    A run that takes a different branch therefore never leaves stale
//!    subscriptions behind.
//!
//! # Cleanup
//!
//! Disposing an effect detaches it from all Deps and blocks future runs.
//! Deps additionally hold their members weakly, so simply dropping every
//! handle to an effect also stops its notifications.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tracing::trace;

use super::context::TrackingGuard;
use super::dep::Dep;

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A scheduler callback. When present on an effect, `trigger` invokes it
/// instead of running the effect, handing timing and batching decisions to
/// the caller.
pub type Scheduler = Arc<dyn Fn() + Send + Sync>;

/// Options for [`effect_with`].
#[derive(Default)]
pub struct EffectOptions {
    /// Do not run the closure on creation; the first run happens when the
    /// returned handle's [`ReactiveEffect::run`] is invoked.
    pub lazy: bool,
    /// Invoked in place of `run` when a dependency changes.
    pub scheduler: Option<Scheduler>,
}

pub(crate) struct EffectInner {
    id: EffectId,
    closure: Box<dyn Fn() + Send + Sync>,
    scheduler: Option<Scheduler>,
    /// Deps this effect currently belongs to. Cleared and rebuilt on every
    /// run.
    deps: RwLock<Vec<Arc<Dep>>>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

/// A re-runnable computation that participates in dependency tracking.
///
/// `ReactiveEffect` is a cheap-clone handle; clones share state and
/// identity. The handle returned by [`effect`] doubles as the runner: call
/// [`run`](Self::run) to re-invoke the computation.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(props! { "count" => 0 });
///
/// let state2 = state.clone();
/// effect(move || {
///     println!("count is {:?}", state2.get("count"));
/// });
///
/// state.set("count", 5.into()).unwrap(); // prints: count is Some(5)
/// ```
#[derive(Clone)]
pub struct ReactiveEffect {
    inner: Arc<EffectInner>,
}

impl ReactiveEffect {
    /// Create a new effect and run it immediately to establish its initial
    /// dependencies.
    pub fn new<F>(closure: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::create(closure, None);
        effect.run();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// The first run happens when [`run`](Self::run) is invoked.
    pub fn new_lazy<F>(closure: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::create(closure, None)
    }

    fn create<F>(closure: F, scheduler: Option<Scheduler>) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(EffectInner {
                id: EffectId::next(),
                closure: Box::new(closure),
                scheduler,
                deps: RwLock::new(Vec::new()),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Run the effect's closure inside a tracking context.
    ///
    /// Old Dep memberships are cleared first and rebuilt by the reads the
    /// closure performs. A panic in the closure propagates to the caller;
    /// the tracking context is restored before it does.
    pub fn run(&self) {
        if self.is_disposed() {
            return;
        }

        self.clear_deps();

        let _guard = TrackingGuard::enter(self.clone());
        (self.inner.closure)();

        self.inner.run_count.fetch_add(1, Ordering::Relaxed);
    }

    /// The scheduler callback supplied at creation, if any.
    pub(crate) fn scheduler(&self) -> Option<Scheduler> {
        self.inner.scheduler.clone()
    }

    /// Record membership in a Dep, for removal before the next run.
    pub(crate) fn remember_dep(&self, dep: &Arc<Dep>) {
        let mut deps = self.inner.deps.write().expect("deps lock poisoned");
        if !deps.iter().any(|known| Arc::ptr_eq(known, dep)) {
            deps.push(Arc::clone(dep));
        }
    }

    /// Remove this effect from every Dep it belongs to.
    fn clear_deps(&self) {
        let deps = {
            let mut deps = self.inner.deps.write().expect("deps lock poisoned");
            std::mem::take(&mut *deps)
        };
        for dep in deps {
            dep.remove(self.id());
        }
    }

    /// Dispose of the effect.
    ///
    /// Detaches it from all Deps; after disposal the effect never runs
    /// again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.clear_deps();
        trace!(effect = ?self.id(), "effect disposed");
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::Relaxed)
    }

    /// Number of Deps this effect currently belongs to.
    pub fn dep_count(&self) -> usize {
        self.inner.deps.read().expect("deps lock poisoned").len()
    }

    pub(crate) fn downgrade(&self) -> Weak<EffectInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<EffectInner>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dep_count", &self.dep_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create an effect that runs immediately.
///
/// The returned handle re-invokes the computation via
/// [`ReactiveEffect::run`].
pub fn effect<F>(closure: F) -> ReactiveEffect
where
    F: Fn() + Send + Sync + 'static,
{
    ReactiveEffect::new(closure)
}

/// Create an effect with explicit options.
///
/// Runs immediately unless `options.lazy` is set. When a scheduler is
/// supplied, dependency changes invoke it instead of re-running the effect.
pub fn effect_with<F>(closure: F, options: EffectOptions) -> ReactiveEffect
where
    F: Fn() + Send + Sync + 'static,
{
    let effect = ReactiveEffect::create(closure, options.scheduler);
    if !options.lazy {
        effect.run();
    }
    effect
}
