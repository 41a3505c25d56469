//! Virtual Tree Nodes
//!
//! A [`VNode`] describes one node of the UI tree. Nodes are built by the
//! factory (`create_vnode` / `h`), classified by a [`ShapeFlags`] bitset,
//! and consumed by the renderer, which dispatches on the flags rather than
//! re-inspecting the children's runtime shape.

use std::sync::{Arc, RwLock};

use bitflags::bitflags;
use indexmap::IndexMap;
use serde_json::Value;

use crate::render::HostId;

/// Property map of a node: attribute/event names to values.
pub type Props = IndexMap<String, Value>;

bitflags! {
    /// Classification bits for a node.
    ///
    /// The children bits always reflect the normalized form of `children`;
    /// the factory is the only constructor, so the renderer can trust the
    /// flags without looking at the children again.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShapeFlags: u32 {
        const ELEMENT = 1;
        const TEXT_CHILDREN = 1 << 3;
        const ARRAY_CHILDREN = 1 << 4;
    }
}

/// The type tag of a node.
#[derive(Debug, Clone)]
pub enum VNodeType {
    /// The text marker: the node renders as a host text node.
    Text,
    /// A host element with the given tag.
    Element(String),
    /// A nested node model, for component/fragment-like composition.
    ///
    /// This core does not reconcile composite nodes; they are a scope
    /// boundary handled by higher layers.
    Composite(VNode),
}

/// The text-marker sentinel, importable by callers that build text nodes
/// explicitly: `create_vnode(TEXT, None, "...")`.
pub const TEXT: VNodeType = VNodeType::Text;

impl PartialEq for VNodeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VNodeType::Text, VNodeType::Text) => true,
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Composite(a), VNodeType::Composite(b)) => VNode::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(tag.to_string())
    }
}

impl From<String> for VNodeType {
    fn from(tag: String) -> Self {
        VNodeType::Element(tag)
    }
}

/// Reconciliation identity hint, extracted from the `"key"` prop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Str(String),
    Int(i64),
}

impl NodeKey {
    /// Derive a key from a prop value. Strings and integers map directly;
    /// anything else falls back to its canonical JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => NodeKey::Str(s.clone()),
            Value::Number(n) if n.is_i64() => NodeKey::Int(n.as_i64().unwrap_or(0)),
            other => NodeKey::Str(other.to_string()),
        }
    }
}

/// One entry of an array-children list.
#[derive(Debug, Clone)]
pub enum Child {
    /// A built node.
    Node(VNode),
    /// A primitive or nullish entry. The factory coerces truthy literals
    /// into text nodes; falsy literals survive here and are skipped by the
    /// renderer.
    Lit(Value),
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        Child::Lit(value)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Lit(Value::String(text.to_string()))
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Lit(Value::String(text))
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Child::Lit(Value::from(n))
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Lit(Value::Bool(b))
    }
}

/// Normalized children of a node.
#[derive(Debug, Clone, Default)]
pub enum Children {
    #[default]
    None,
    /// String content; the node's element sets its text directly.
    Text(String),
    /// Ordered child entries.
    Nodes(Vec<Child>),
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(text.to_string())
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(text)
    }
}

impl From<Vec<Child>> for Children {
    fn from(children: Vec<Child>) -> Self {
        Children::Nodes(children)
    }
}

impl From<Vec<VNode>> for Children {
    fn from(nodes: Vec<VNode>) -> Self {
        Children::Nodes(nodes.into_iter().map(Child::Node).collect())
    }
}

impl From<()> for Children {
    fn from(_: ()) -> Self {
        Children::None
    }
}

struct VNodeInner {
    ty: VNodeType,
    props: Option<Props>,
    key: Option<NodeKey>,
    children: Children,
    shape: ShapeFlags,
    patch_flag: u32,
    /// Host handle, assigned when the node is mounted. Shared across
    /// clones so the stored tree and the tree being patched agree.
    el: RwLock<Option<HostId>>,
}

/// A virtual-tree node.
///
/// `VNode` is a cheap-clone handle over shared node data; reference
/// identity (`ptr_eq`) backs the renderer's patch fast path, and clones in
/// children lists share the mounted host handle slot.
#[derive(Clone)]
pub struct VNode {
    inner: Arc<VNodeInner>,
}

impl VNode {
    pub(crate) fn from_parts(
        ty: VNodeType,
        props: Option<Props>,
        key: Option<NodeKey>,
        children: Children,
        shape: ShapeFlags,
    ) -> Self {
        Self {
            inner: Arc::new(VNodeInner {
                ty,
                props,
                key,
                children,
                shape,
                patch_flag: 0,
                el: RwLock::new(None),
            }),
        }
    }

    pub fn ty(&self) -> &VNodeType {
        &self.inner.ty
    }

    pub fn props(&self) -> Option<&Props> {
        self.inner.props.as_ref()
    }

    pub fn key(&self) -> Option<&NodeKey> {
        self.inner.key.as_ref()
    }

    pub fn children(&self) -> &Children {
        &self.inner.children
    }

    pub fn shape(&self) -> ShapeFlags {
        self.inner.shape
    }

    /// Reserved optimization hint. Always zero in this core.
    pub fn patch_flag(&self) -> u32 {
        self.inner.patch_flag
    }

    /// The mounted host handle, if any.
    pub fn el(&self) -> Option<HostId> {
        *self.inner.el.read().expect("el lock poisoned")
    }

    pub(crate) fn set_el(&self, el: HostId) {
        *self.inner.el.write().expect("el lock poisoned") = Some(el);
    }

    /// Text content of a text node or text-children element; empty when
    /// children carry no text.
    pub fn text(&self) -> &str {
        match &self.inner.children {
            Children::Text(text) => text,
            _ => "",
        }
    }

    /// Iterate the node entries of an array-children list, skipping falsy
    /// literals (the renderer never mounts those).
    pub fn child_nodes(&self) -> impl Iterator<Item = &VNode> {
        let children: &[Child] = match &self.inner.children {
            Children::Nodes(children) => children,
            _ => &[],
        };
        children.iter().filter_map(|child| match child {
            Child::Node(node) => Some(node),
            Child::Lit(_) => None,
        })
    }

    /// Reference identity: do two handles share the same node data?
    pub fn ptr_eq(a: &VNode, b: &VNode) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl std::fmt::Debug for VNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VNode")
            .field("ty", &self.inner.ty)
            .field("key", &self.inner.key)
            .field("shape", &self.inner.shape)
            .field("el", &self.el())
            .finish()
    }
}

/// The same-node test used by reconciliation: equal type and equal key.
///
/// Two nodes that fail this test never reuse a host handle; the old node
/// is unmounted and the new one mounted fresh.
pub fn is_same_vnode(a: &VNode, b: &VNode) -> bool {
    a.ty() == b.ty() && a.key() == b.key()
}

/// A literal child is falsy when it would be skipped entirely during
/// mounting: null, false, zero, or the empty string.
pub(crate) fn lit_is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Text form of a truthy literal child.
pub(crate) fn lit_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
