//! Renderer
//!
//! The renderer reconciles two virtual-tree snapshots and emits the minimal
//! host operations that transform one into the other. It is generic over a
//! [`HostOps`] adapter, so the same algorithm drives any display tree that
//! can create, insert, and remove nodes.
//!
//! The renderer holds no state beyond the previously rendered root per
//! container and the host handle attached to each mounted node.

mod host;
mod renderer;

pub use host::{HostId, HostOps};
pub use renderer::Renderer;
