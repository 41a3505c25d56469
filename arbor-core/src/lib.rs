//! Arbor Core
//!
//! This crate provides the core runtime for the Arbor reactive UI
//! framework. It implements:
//!
//! - Reactive primitives (stores, effects) with fine-grained dependency
//!   tracking
//! - The virtual-tree node model and factory
//! - The mount/patch reconciliation algorithm over an abstract host-tree
//!   adapter
//!
//! Host bindings (a real display-tree adapter, attribute/style/event patch
//! modules) and the application bootstrap layer live in separate crates;
//! this crate drives them through the [`render::HostOps`] trait and has no
//! dependency on any concrete display surface.
//!
//! # Architecture
//!
//! - `reactive`: dependency tracking between state reads and the effects
//!   that read them, plus the notification protocol
//! - `vnode`: the node model and the `h`/`create_vnode` factory
//! - `render`: the renderer that reconciles two tree snapshots into
//!   minimal host operations
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_core::{effect, h, props, reactive, Renderer};
//!
//! let state = reactive(props! { "label" => "hello" });
//! let renderer = Renderer::new(my_host_adapter);
//!
//! let state2 = state.clone();
//! effect(move || {
//!     let label = state2.get("label").unwrap();
//!     let tree = h("p", (), label.as_str().unwrap_or(""));
//!     renderer.render(Some(&tree), container);
//! });
//!
//! // Re-renders through the effect; the renderer patches in place.
//! state.set("label", "goodbye".into()).unwrap();
//! ```

pub mod reactive;
pub mod render;
pub mod vnode;

pub use reactive::{
    effect, effect_with, reactive, reactive_of, readonly, EffectOptions, ReactiveEffect, Store,
    StoreError,
};
pub use render::{HostId, HostOps, Renderer};
pub use vnode::{create_vnode, h, Child, Children, Props, ShapeFlags, VNode, VNodeType, TEXT};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
