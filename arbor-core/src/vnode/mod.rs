//! Node Model
//!
//! This module defines the virtual-tree node: an immutable-by-convention
//! description of one piece of UI (type tag, properties, children, identity
//! key), plus the factory that normalizes heterogeneous call shapes into
//! canonical nodes.
//!
//! Nodes are pure values; they carry no behavior. The renderer consumes
//! them and attaches host handles as trees are mounted, but the node model
//! itself has no dependency on any renderer.

mod factory;
mod node;

pub use factory::{create_vnode, h, HArg};
pub use node::{
    is_same_vnode, Child, Children, NodeKey, Props, ShapeFlags, VNode, VNodeType, TEXT,
};
