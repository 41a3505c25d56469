//! Node Factory
//!
//! `create_vnode` builds canonical nodes; [`h`] accepts the loose call
//! shapes UI code actually writes and normalizes them. Both are pure and
//! total: no call shape panics, and ambiguous shapes default to their most
//! literal interpretation (a map is props, not children).

use serde_json::Value;

use super::node::{
    lit_is_falsy, lit_text, Child, Children, NodeKey, Props, ShapeFlags, VNode, VNodeType, TEXT,
};

/// Build a node from a type, optional props, and children.
///
/// The `"key"` prop, when present, is extracted into the node's key. Shape
/// flags are computed from the type and the normalized children; truthy
/// primitive entries in a children list are coerced to text nodes here, so
/// the renderer only ever sees nodes and skippable falsy literals.
pub fn create_vnode<T, C>(ty: T, props: Option<Props>, children: C) -> VNode
where
    T: Into<VNodeType>,
    C: Into<Children>,
{
    let ty = ty.into();

    let mut props = props;
    let key = props
        .as_mut()
        .and_then(|p| p.shift_remove("key"))
        .map(|v| NodeKey::from_value(&v));

    let children = normalize_children(children.into());

    let mut shape = match &ty {
        VNodeType::Element(_) => ShapeFlags::ELEMENT,
        _ => ShapeFlags::empty(),
    };
    match &children {
        Children::Text(_) => shape |= ShapeFlags::TEXT_CHILDREN,
        Children::Nodes(_) => shape |= ShapeFlags::ARRAY_CHILDREN,
        Children::None => {}
    }

    VNode::from_parts(ty, props, key, children, shape)
}

/// Empty children collapse to `Children::None` so the shape bits reflect
/// what will actually render; truthy literals become text nodes.
fn normalize_children(children: Children) -> Children {
    match children {
        Children::Text(text) if text.is_empty() => Children::None,
        Children::Nodes(entries) if entries.is_empty() => Children::None,
        Children::Nodes(entries) => Children::Nodes(
            entries
                .into_iter()
                .map(|child| match child {
                    Child::Lit(value) if !lit_is_falsy(&value) => {
                        Child::Node(create_vnode(TEXT, None, lit_text(&value)))
                    }
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// One argument of [`h`], after conversion from whatever the caller wrote.
pub enum HArg {
    None,
    Props(Props),
    Text(String),
    Node(VNode),
    List(Vec<Child>),
    Lit(Value),
}

impl From<()> for HArg {
    fn from(_: ()) -> Self {
        HArg::None
    }
}

impl From<Props> for HArg {
    fn from(props: Props) -> Self {
        HArg::Props(props)
    }
}

impl From<&str> for HArg {
    fn from(text: &str) -> Self {
        HArg::Text(text.to_string())
    }
}

impl From<String> for HArg {
    fn from(text: String) -> Self {
        HArg::Text(text)
    }
}

impl From<VNode> for HArg {
    fn from(node: VNode) -> Self {
        HArg::Node(node)
    }
}

impl From<Vec<Child>> for HArg {
    fn from(children: Vec<Child>) -> Self {
        HArg::List(children)
    }
}

impl From<Vec<VNode>> for HArg {
    fn from(nodes: Vec<VNode>) -> Self {
        HArg::List(nodes.into_iter().map(Child::Node).collect())
    }
}

impl From<Value> for HArg {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => HArg::Props(map.into_iter().collect()),
            Value::Array(items) => HArg::List(items.into_iter().map(Child::Lit).collect()),
            Value::String(text) => HArg::Text(text),
            other => HArg::Lit(other),
        }
    }
}

/// Convenience node constructor with call-shape normalization.
///
/// The two-argument form (`b` empty) distinguishes a props map, a children
/// list, a single built node (wrapped as one-element children), and plain
/// text. With both arguments present, `a` contributes the props (anything
/// that is not a props map contributes none) and `b` the children; a
/// single built node in `b` is wrapped in a one-element list.
pub fn h<T, A, B>(ty: T, a: A, b: B) -> VNode
where
    T: Into<VNodeType>,
    A: Into<HArg>,
    B: Into<HArg>,
{
    let ty = ty.into();
    match (a.into(), b.into()) {
        (a, HArg::None) => match a {
            HArg::None => create_vnode(ty, None, ()),
            HArg::Props(props) => create_vnode(ty, Some(props), ()),
            HArg::Node(node) => create_vnode(ty, None, vec![Child::Node(node)]),
            HArg::List(children) => create_vnode(ty, None, children),
            HArg::Text(text) => create_vnode(ty, None, text),
            HArg::Lit(value) => create_vnode(ty, None, vec![Child::Lit(value)]),
        },
        (a, b) => {
            let props = match a {
                HArg::Props(props) => Some(props),
                _ => None,
            };
            create_vnode(ty, props, children_of(b))
        }
    }
}

fn children_of(arg: HArg) -> Children {
    match arg {
        HArg::None => Children::None,
        HArg::Text(text) => Children::Text(text),
        HArg::Node(node) => Children::Nodes(vec![Child::Node(node)]),
        HArg::List(children) => Children::Nodes(children),
        HArg::Lit(value) => Children::Nodes(vec![Child::Lit(value)]),
        // A props map in children position has no literal reading; drop it.
        HArg::Props(_) => Children::None,
    }
}

/// Build a [`Props`] map: `props! { "id" => "a", "class" => "wide" }`.
#[macro_export]
macro_rules! props {
    () => { $crate::vnode::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::vnode::Props::new();
        $( map.insert(($key).to_string(), $crate::__private::serde_json::Value::from($value)); )+
        map
    }};
}

/// Build a children list: `children![h("li", (), "a"), "plain text", 3]`.
#[macro_export]
macro_rules! children {
    ($($child:expr),* $(,)?) => {{
        let list: ::std::vec::Vec<$crate::vnode::Child> = vec![ $( $crate::vnode::Child::from($child) ),* ];
        list
    }};
}
