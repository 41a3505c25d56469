//! Mount/Patch Algorithm
//!
//! Reconciliation compares a previous and next node and emits host
//! operations to transform one into the other. Per container the renderer
//! moves through three states: *empty* (no previous render), *mounted* (a
//! previous root is stored), and back to *empty* when a null render tears
//! the tree down.
//!
//! Dispatch trusts each node's shape flags; children are never re-inspected
//! at patch time.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::vnode::{is_same_vnode, NodeKey, Props, ShapeFlags, VNode, VNodeType};

use super::host::{HostId, HostOps};

/// The virtual-tree renderer.
///
/// Holds the host adapter and, per container, the previously rendered
/// root. Everything else lives on the nodes themselves (the mounted host
/// handle).
pub struct Renderer<O: HostOps> {
    ops: O,
    roots: Mutex<HashMap<HostId, VNode>>,
}

impl<O: HostOps> Renderer<O> {
    pub fn new(ops: O) -> Self {
        Self {
            ops,
            roots: Mutex::new(HashMap::new()),
        }
    }

    /// Render a node into a container.
    ///
    /// `None` unmounts whatever the container currently holds and clears
    /// the stored root. Otherwise the node is reconciled against the
    /// stored root (or mounted fresh) and stored as the new root.
    pub fn render(&self, vnode: Option<&VNode>, container: HostId) {
        let mut roots = self.roots.lock();
        match vnode {
            None => {
                if let Some(prev) = roots.remove(&container) {
                    debug!(?container, "unmounting container root");
                    self.unmount(&prev);
                }
            }
            Some(next) => {
                let prev = roots.get(&container).cloned();
                self.patch(prev.as_ref(), next, container, None);
                roots.insert(container, next.clone());
            }
        }
    }

    /// The stored root for a container, if it is in the *mounted* state.
    pub fn current_root(&self, container: HostId) -> Option<VNode> {
        self.roots.lock().get(&container).cloned()
    }

    /// Reconcile `next` against `prev` inside `container`.
    ///
    /// `prev = None` means mount. A `prev` that is not the same node as
    /// `next` (differing type or key) is unmounted entirely and `next`
    /// mounts fresh.
    fn patch(&self, prev: Option<&VNode>, next: &VNode, container: HostId, anchor: Option<HostId>) {
        if let Some(p) = prev {
            if VNode::ptr_eq(p, next) {
                return;
            }
        }

        let mut prev = prev;
        if let Some(p) = prev {
            if !is_same_vnode(p, next) {
                self.unmount(p);
                prev = None;
            }
        }

        match next.ty() {
            VNodeType::Text => self.process_text(prev, next, container, anchor),
            _ if next.shape().contains(ShapeFlags::ELEMENT) => {
                self.process_element(prev, next, container, anchor)
            }
            other => {
                // Composite and other non-element types are a scope
                // boundary: not rendered here, never an error.
                debug!(ty = ?other, "skipping unhandled vnode type");
            }
        }
    }

    fn process_text(
        &self,
        prev: Option<&VNode>,
        next: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        match prev.and_then(|p| p.el()) {
            None => {
                let el = self.ops.create_text(next.text());
                next.set_el(el);
                self.ops.insert(el, container, anchor);
            }
            Some(el) => {
                next.set_el(el);
                let prev_text = prev.map(|p| p.text()).unwrap_or("");
                if next.text() != prev_text {
                    self.ops.set_text(el, next.text());
                }
            }
        }
    }

    fn process_element(
        &self,
        prev: Option<&VNode>,
        next: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        match prev {
            None => self.mount_element(next, container, anchor),
            Some(p) => match p.el() {
                Some(el) => self.patch_element(p, next, el),
                // The previous node never attached a handle; nothing to
                // reuse.
                None => self.mount_element(next, container, anchor),
            },
        }
    }

    fn mount_element(&self, vnode: &VNode, container: HostId, anchor: Option<HostId>) {
        let VNodeType::Element(tag) = vnode.ty() else {
            unreachable!("mount_element requires an element node");
        };

        let el = self.ops.create_element(tag);
        vnode.set_el(el);

        let shape = vnode.shape();
        if shape.contains(ShapeFlags::TEXT_CHILDREN) {
            self.ops.set_element_text(el, vnode.text());
        } else if shape.contains(ShapeFlags::ARRAY_CHILDREN) {
            self.mount_children(vnode, el);
        }

        if let Some(props) = vnode.props() {
            for (key, value) in props {
                self.ops.patch_prop(el, key, None, Some(value));
            }
        }

        self.ops.insert(el, container, anchor);
    }

    /// Mount each child of an array-children node, in order. Falsy
    /// literal entries are skipped; everything else is a node (the
    /// factory already coerced truthy literals to text nodes).
    fn mount_children(&self, vnode: &VNode, container: HostId) {
        for child in vnode.child_nodes() {
            self.patch(None, child, container, None);
        }
    }

    fn patch_element(&self, prev: &VNode, next: &VNode, el: HostId) {
        next.set_el(el);
        self.patch_props(el, prev.props(), next.props());
        self.patch_children(prev, next, el);
    }

    /// Call `patch_prop` for every key present in either prop set, with
    /// the absent side as `None`. Value-level short-circuiting belongs to
    /// the adapter.
    fn patch_props(&self, el: HostId, prev: Option<&Props>, next: Option<&Props>) {
        let empty = Props::new();
        let prev = prev.unwrap_or(&empty);
        let next = next.unwrap_or(&empty);

        for (key, value) in next {
            self.ops.patch_prop(el, key, prev.get(key), Some(value));
        }
        for (key, value) in prev {
            if !next.contains_key(key) {
                self.ops.patch_prop(el, key, Some(value), None);
            }
        }
    }

    fn patch_children(&self, prev: &VNode, next: &VNode, el: HostId) {
        let prev_shape = prev.shape();
        let next_shape = next.shape();

        if next_shape.contains(ShapeFlags::TEXT_CHILDREN) {
            if prev_shape.contains(ShapeFlags::ARRAY_CHILDREN) {
                for child in prev.child_nodes() {
                    self.unmount(child);
                }
            }
            if next.text() != prev.text() || prev_shape.contains(ShapeFlags::ARRAY_CHILDREN) {
                self.ops.set_element_text(el, next.text());
            }
        } else if next_shape.contains(ShapeFlags::ARRAY_CHILDREN) {
            if prev_shape.contains(ShapeFlags::TEXT_CHILDREN) {
                self.ops.set_element_text(el, "");
                self.mount_children(next, el);
            } else if prev_shape.contains(ShapeFlags::ARRAY_CHILDREN) {
                self.diff_children(prev, next, el);
            } else {
                self.mount_children(next, el);
            }
        } else {
            // next has no children
            if prev_shape.contains(ShapeFlags::TEXT_CHILDREN) {
                self.ops.set_element_text(el, "");
            } else if prev_shape.contains(ShapeFlags::ARRAY_CHILDREN) {
                for child in prev.child_nodes() {
                    self.unmount(child);
                }
            }
        }
    }

    /// Reconcile two array-children lists.
    ///
    /// Strategy: fully keyed lists diff by key (same key is always patched
    /// in place, never recreated); unkeyed lists of equal length patch
    /// positionally; anything else falls back to full unmount/mount.
    fn diff_children(&self, prev: &VNode, next: &VNode, container: HostId) {
        let old: Vec<VNode> = prev.child_nodes().cloned().collect();
        let new: Vec<VNode> = next.child_nodes().cloned().collect();

        let old_keyed = !old.is_empty() && old.iter().all(|n| n.key().is_some());
        let new_keyed = !new.is_empty() && new.iter().all(|n| n.key().is_some());
        let any_key = old.iter().chain(new.iter()).any(|n| n.key().is_some());

        if old_keyed && new_keyed {
            self.diff_keyed(old, new, container);
        } else if !any_key && old.len() == new.len() {
            for (i, (o, n)) in old.iter().zip(new.iter()).enumerate() {
                // Anchor at the following old sibling so a replaced node
                // keeps its position.
                let anchor = old.get(i + 1).and_then(|sibling| sibling.el());
                self.patch(Some(o), n, container, anchor);
            }
        } else {
            debug!(
                old = old.len(),
                new = new.len(),
                "child lists not diffable, remounting"
            );
            for o in &old {
                self.unmount(o);
            }
            for n in &new {
                self.patch(None, n, container, None);
            }
        }
    }

    /// Keyed diff: index the old list by key, then walk the new list in
    /// reverse with a running anchor. Matched keys patch in place and are
    /// re-inserted at the anchor (an insert of an attached node is a
    /// move), so order is restored without computing a move-minimal plan.
    fn diff_keyed(&self, old: Vec<VNode>, new: Vec<VNode>, container: HostId) {
        let mut old_index: IndexMap<NodeKey, VNode> = old
            .into_iter()
            .filter_map(|n| n.key().cloned().map(|k| (k, n)))
            .collect();

        let mut anchor: Option<HostId> = None;
        for n in new.iter().rev() {
            let key = n.key().cloned().expect("keyed diff requires keys");
            match old_index.swap_remove(&key) {
                Some(o) => {
                    let same = is_same_vnode(&o, n);
                    self.patch(Some(&o), n, container, anchor);
                    if same {
                        if let Some(el) = n.el() {
                            self.ops.insert(el, container, anchor);
                        }
                    }
                }
                None => self.patch(None, n, container, anchor),
            }
            anchor = n.el().or(anchor);
        }

        for (_, stale) in old_index {
            self.unmount(&stale);
        }
    }

    /// Remove a mounted node's host handle.
    ///
    /// The adapter's `remove` detaches the whole subtree, so descendants
    /// need no individual removal here.
    fn unmount(&self, vnode: &VNode) {
        if let Some(el) = vnode.el() {
            self.ops.remove(el);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::create_vnode;
    use crate::{children, h, props, VNodeType, TEXT};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum NodeKind {
        Element(String),
        Text,
    }

    #[derive(Debug)]
    struct TestNode {
        kind: NodeKind,
        text: String,
        children: Vec<HostId>,
        parent: Option<HostId>,
    }

    #[derive(Default)]
    struct HostState {
        next_id: u64,
        nodes: HashMap<HostId, TestNode>,
        prop_calls: Vec<(HostId, String, Option<Value>, Option<Value>)>,
    }

    /// In-memory display tree implementing the adapter contract: insert
    /// moves attached nodes, remove detaches whole subtrees.
    #[derive(Clone, Default)]
    struct TestHost {
        state: Arc<Mutex<HostState>>,
    }

    impl TestHost {
        fn alloc(&self, kind: NodeKind, text: &str) -> HostId {
            let mut state = self.state.lock();
            state.next_id += 1;
            let id = HostId::from_raw(state.next_id);
            state.nodes.insert(
                id,
                TestNode {
                    kind,
                    text: text.to_string(),
                    children: Vec::new(),
                    parent: None,
                },
            );
            id
        }

        fn container(&self) -> HostId {
            self.alloc(NodeKind::Element("root".to_string()), "")
        }

        fn children_of(&self, parent: HostId) -> Vec<HostId> {
            self.state.lock().nodes[&parent].children.clone()
        }

        fn text_of(&self, id: HostId) -> String {
            self.state.lock().nodes[&id].text.clone()
        }

        fn tag_of(&self, id: HostId) -> String {
            match &self.state.lock().nodes[&id].kind {
                NodeKind::Element(tag) => tag.clone(),
                NodeKind::Text => "#text".to_string(),
            }
        }

        fn exists(&self, id: HostId) -> bool {
            self.state.lock().nodes.contains_key(&id)
        }

        fn prop_calls(&self) -> Vec<(HostId, String, Option<Value>, Option<Value>)> {
            self.state.lock().prop_calls.clone()
        }

        fn detach(state: &mut HostState, node: HostId) {
            if let Some(parent) = state.nodes.get(&node).and_then(|n| n.parent) {
                if let Some(p) = state.nodes.get_mut(&parent) {
                    p.children.retain(|c| *c != node);
                }
            }
            if let Some(n) = state.nodes.get_mut(&node) {
                n.parent = None;
            }
        }

        fn drop_subtree(state: &mut HostState, node: HostId) {
            if let Some(n) = state.nodes.remove(&node) {
                for child in n.children {
                    Self::drop_subtree(state, child);
                }
            }
        }
    }

    impl HostOps for TestHost {
        fn create_element(&self, tag: &str) -> HostId {
            self.alloc(NodeKind::Element(tag.to_string()), "")
        }

        fn create_text(&self, text: &str) -> HostId {
            self.alloc(NodeKind::Text, text)
        }

        fn set_text(&self, node: HostId, text: &str) {
            if let Some(n) = self.state.lock().nodes.get_mut(&node) {
                n.text = text.to_string();
            }
        }

        fn set_element_text(&self, el: HostId, text: &str) {
            let mut state = self.state.lock();
            let children = state
                .nodes
                .get(&el)
                .map(|n| n.children.clone())
                .unwrap_or_default();
            for child in children {
                Self::drop_subtree(&mut state, child);
            }
            if let Some(n) = state.nodes.get_mut(&el) {
                n.children.clear();
                n.text = text.to_string();
            }
        }

        fn insert(&self, node: HostId, parent: HostId, anchor: Option<HostId>) {
            let mut state = self.state.lock();
            Self::detach(&mut state, node);
            if let Some(n) = state.nodes.get_mut(&node) {
                n.parent = Some(parent);
            }
            if let Some(p) = state.nodes.get_mut(&parent) {
                let index = anchor
                    .and_then(|a| p.children.iter().position(|c| *c == a))
                    .unwrap_or(p.children.len());
                p.children.insert(index, node);
            }
        }

        fn remove(&self, node: HostId) {
            let mut state = self.state.lock();
            Self::detach(&mut state, node);
            Self::drop_subtree(&mut state, node);
        }

        fn patch_prop(&self, el: HostId, key: &str, prev: Option<&Value>, next: Option<&Value>) {
            self.state.lock().prop_calls.push((
                el,
                key.to_string(),
                prev.cloned(),
                next.cloned(),
            ));
        }
    }

    fn setup() -> (TestHost, Renderer<TestHost>, HostId) {
        let host = TestHost::default();
        let renderer = Renderer::new(host.clone());
        let container = host.container();
        (host, renderer, container)
    }

    #[test]
    fn mounts_element_with_text_children() {
        let (host, renderer, container) = setup();

        let node = h("p", (), "hi");
        renderer.render(Some(&node), container);

        let children = host.children_of(container);
        assert_eq!(children.len(), 1);
        assert_eq!(host.tag_of(children[0]), "p");
        assert_eq!(host.text_of(children[0]), "hi");
        assert_eq!(node.el(), Some(children[0]));
    }

    #[test]
    fn text_update_reuses_host_handle() {
        let (host, renderer, container) = setup();

        let first = h("p", (), "hi");
        renderer.render(Some(&first), container);
        let el = first.el().expect("mounted");

        let second = h("p", (), "bye");
        renderer.render(Some(&second), container);

        // Same handle, only the text changed
        assert_eq!(second.el(), Some(el));
        assert_eq!(host.children_of(container), vec![el]);
        assert_eq!(host.text_of(el), "bye");
    }

    #[test]
    fn rerendering_identical_node_is_a_no_op() {
        let (host, renderer, container) = setup();

        let node = h("p", (), "hi");
        renderer.render(Some(&node), container);
        let before = host.children_of(container);

        renderer.render(Some(&node), container);
        assert_eq!(host.children_of(container), before);
    }

    #[test]
    fn different_tag_same_key_replaces_host_node() {
        let (host, renderer, container) = setup();

        let first = h("p", props! { "key" => "1", "id" => "1" }, ());
        renderer.render(Some(&first), container);
        let old_el = first.el().expect("mounted");

        let second = h("span", props! { "key" => "1", "id" => "1" }, ());
        renderer.render(Some(&second), container);
        let new_el = second.el().expect("mounted");

        assert_ne!(old_el, new_el);
        assert!(!host.exists(old_el));
        assert_eq!(host.tag_of(new_el), "span");
    }

    #[test]
    fn render_null_unmounts_and_clears_root() {
        let (host, renderer, container) = setup();

        let tree = h(
            "div",
            children![h("p", (), "a"), h("p", (), "b")],
            (),
        );
        renderer.render(Some(&tree), container);
        assert_eq!(host.children_of(container).len(), 1);
        assert!(renderer.current_root(container).is_some());

        renderer.render(None, container);
        assert!(host.children_of(container).is_empty());
        assert!(renderer.current_root(container).is_none());

        // A second null render on the now-empty container is inert
        renderer.render(None, container);
    }

    #[test]
    fn mount_skips_falsy_literal_children() {
        let (host, renderer, container) = setup();

        let node = h(
            "ul",
            children![false, h("li", (), "a"), "", 0, "b"],
            (),
        );
        renderer.render(Some(&node), container);

        let ul = host.children_of(container)[0];
        let items = host.children_of(ul);
        assert_eq!(items.len(), 2);
        assert_eq!(host.tag_of(items[0]), "li");
        assert_eq!(host.tag_of(items[1]), "#text");
        assert_eq!(host.text_of(items[1]), "b");
    }

    #[test]
    fn mount_applies_props_with_null_prev() {
        let (host, renderer, container) = setup();

        let node = h("div", props! { "id" => "a", "class" => "wide" }, ());
        renderer.render(Some(&node), container);

        let calls = host.prop_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|(el, _, prev, _)| *el == node.el().unwrap() && prev.is_none()));
    }

    #[test]
    fn prop_diff_covers_added_changed_and_removed_keys() {
        let (host, renderer, container) = setup();

        let first = h("div", props! { "id" => "a", "title" => "t" }, ());
        renderer.render(Some(&first), container);
        let el = first.el().unwrap();

        let second = h("div", props! { "id" => "b", "class" => "c" }, ());
        renderer.render(Some(&second), container);

        let calls: Vec<_> = host.prop_calls().into_iter().skip(2).collect();
        assert!(calls.contains(&(
            el,
            "id".to_string(),
            Some(Value::from("a")),
            Some(Value::from("b"))
        )));
        assert!(calls.contains(&(
            el,
            "class".to_string(),
            None,
            Some(Value::from("c"))
        )));
        assert!(calls.contains(&(
            el,
            "title".to_string(),
            Some(Value::from("t")),
            None
        )));
    }

    #[test]
    fn keyed_reorder_preserves_handles() {
        let (host, renderer, container) = setup();

        let item = |k: &str| h("li", props! { "key" => k }, k);

        let first = h("ul", children![item("a"), item("b"), item("c")], ());
        renderer.render(Some(&first), container);
        let ul = host.children_of(container)[0];

        let els: Vec<_> = first.child_nodes().map(|n| n.el().unwrap()).collect();
        assert_eq!(host.children_of(ul), els);

        let second = h("ul", children![item("c"), item("a"), item("b")], ());
        renderer.render(Some(&second), container);

        // Same handles, new order
        let expected = vec![els[2], els[0], els[1]];
        assert_eq!(host.children_of(ul), expected);
        for id in &expected {
            assert!(host.exists(*id));
        }
    }

    #[test]
    fn keyed_diff_unmounts_removed_and_mounts_added() {
        let (host, renderer, container) = setup();

        let item = |k: &str, text: &str| h("li", props! { "key" => k }, text);

        let first = h("ul", children![item("a", "a"), item("b", "b")], ());
        renderer.render(Some(&first), container);
        let ul = host.children_of(container)[0];
        let a_el = first.child_nodes().next().unwrap().el().unwrap();
        let b_el = first.child_nodes().nth(1).unwrap().el().unwrap();

        let second = h("ul", children![item("a", "a2"), item("d", "d")], ());
        renderer.render(Some(&second), container);

        assert!(host.exists(a_el));
        assert!(!host.exists(b_el));
        assert_eq!(host.text_of(a_el), "a2");
        assert_eq!(host.children_of(ul).len(), 2);
        assert_eq!(host.children_of(ul)[0], a_el);
    }

    #[test]
    fn unkeyed_equal_length_lists_patch_positionally() {
        let (host, renderer, container) = setup();

        let first = h("ul", children![h("li", (), "a"), h("li", (), "b")], ());
        renderer.render(Some(&first), container);
        let ul = host.children_of(container)[0];
        let before = host.children_of(ul);

        let second = h("ul", children![h("li", (), "a2"), h("li", (), "b2")], ());
        renderer.render(Some(&second), container);

        // Same handles, updated text
        assert_eq!(host.children_of(ul), before);
        assert_eq!(host.text_of(before[0]), "a2");
        assert_eq!(host.text_of(before[1]), "b2");
    }

    #[test]
    fn unkeyed_length_change_falls_back_to_remount() {
        let (host, renderer, container) = setup();

        let first = h("ul", children![h("li", (), "a"), h("li", (), "b")], ());
        renderer.render(Some(&first), container);
        let ul = host.children_of(container)[0];
        let before = host.children_of(ul);

        let second = h(
            "ul",
            children![h("li", (), "a"), h("li", (), "b"), h("li", (), "c")],
            (),
        );
        renderer.render(Some(&second), container);

        let after = host.children_of(ul);
        assert_eq!(after.len(), 3);
        for id in &before {
            assert!(!host.exists(*id));
        }
    }

    #[test]
    fn array_children_replaced_by_text() {
        let (host, renderer, container) = setup();

        let first = h("div", children![h("p", (), "a"), h("p", (), "b")], ());
        renderer.render(Some(&first), container);
        let div = host.children_of(container)[0];
        let old_children = host.children_of(div);

        let second = h("div", (), "plain");
        renderer.render(Some(&second), container);

        assert_eq!(host.text_of(div), "plain");
        assert!(host.children_of(div).is_empty());
        for id in old_children {
            assert!(!host.exists(id));
        }
    }

    #[test]
    fn text_children_replaced_by_array() {
        let (host, renderer, container) = setup();

        let first = h("div", (), "plain");
        renderer.render(Some(&first), container);
        let div = host.children_of(container)[0];

        let second = h("div", children![h("p", (), "a")], ());
        renderer.render(Some(&second), container);

        assert_eq!(host.text_of(div), "");
        assert_eq!(host.children_of(div).len(), 1);
    }

    #[test]
    fn explicit_text_node_mounts_and_updates_in_place() {
        let (host, renderer, container) = setup();

        let first = create_vnode(TEXT, None, "hi");
        renderer.render(Some(&first), container);
        let el = first.el().expect("mounted");
        assert_eq!(host.tag_of(el), "#text");
        assert_eq!(host.text_of(el), "hi");

        let second = create_vnode(TEXT, None, "bye");
        renderer.render(Some(&second), container);
        assert_eq!(second.el(), Some(el));
        assert_eq!(host.text_of(el), "bye");
    }

    #[test]
    fn composite_node_is_skipped_without_error() {
        let (host, renderer, container) = setup();

        let inner = h("div", (), ());
        let node = create_vnode(VNodeType::Composite(inner), None, ());
        renderer.render(Some(&node), container);

        assert!(host.children_of(container).is_empty());
        assert!(node.el().is_none());
    }
}
