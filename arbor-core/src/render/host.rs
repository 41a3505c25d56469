//! Host Operations
//!
//! The adapter interface through which the renderer manipulates the actual
//! display tree. The core never touches a real display surface; it drives
//! these operations and trusts the adapter's semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque handle to a node owned by the host adapter.
///
/// The adapter mints handles and maps them to real display nodes; the
/// renderer only stores and compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostId(u64);

impl HostId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Operations a host adapter must provide.
///
/// Contract notes:
///
/// - `insert` with an anchor places the node before the anchor; inserting
///   an already-attached node moves it (DOM `insertBefore` semantics).
/// - `remove` detaches the whole subtree rooted at the handle; the
///   renderer does not re-implement cascading removal.
/// - `patch_prop` receives both the previous and next value (`None` for
///   absent) and owns all attribute/style/event semantics.
pub trait HostOps: Send + Sync {
    fn create_element(&self, tag: &str) -> HostId;

    fn create_text(&self, text: &str) -> HostId;

    fn set_text(&self, node: HostId, text: &str);

    fn set_element_text(&self, el: HostId, text: &str);

    fn insert(&self, node: HostId, parent: HostId, anchor: Option<HostId>);

    fn remove(&self, node: HostId);

    fn patch_prop(&self, el: HostId, key: &str, prev: Option<&Value>, next: Option<&Value>);
}
