//! Declarative element values: what component functions return and what
//! the reconciler diffs.
//!
//! An [`Element`] is an immutable description of one tree position. Every
//! construction allocates a fresh [`ElementId`]; the reconciler compares
//! ids, not contents, to detect the "nothing changed here" fast path.

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::context::ContextId;
use crate::hash;
use crate::hooks::Hooks;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one element value. Fresh per construction, never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ElementId(u64);

impl ElementId {
    fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Explicit reconciliation key, hashed down to a `u64` so arbitrary
/// user keys stay cheap to store and compare.
pub type Key = u64;

/// A value thrown out of a component evaluation.
///
/// Components "throw" by returning `Err(Failure)`; the reconciler routes
/// the value to the nearest error boundary rather than propagating it.
#[derive(Clone)]
pub struct Failure {
    value: Rc<dyn Any>,
    message: Option<Rc<str>>,
}

impl Failure {
    pub fn msg(message: impl Into<String>) -> Self {
        let message: Rc<str> = message.into().into();
        Self {
            value: Rc::new(()),
            message: Some(message),
        }
    }

    pub fn from_value<T: Any>(value: T) -> Self {
        Self {
            value: Rc::new(value),
            message: None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "Failure({message:?})"),
            None => write!(f, "Failure(<value>)"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str("component evaluation failure"),
        }
    }
}

/// A component: a pure function from props and children to a child node.
pub type ComponentFn =
    Rc<dyn Fn(&Props, &Node, &mut Hooks<'_>) -> Result<Node, Failure>>;

/// A prop value. `Any` entries compare by pointer identity, everything
/// else by value.
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Any(Rc<dyn Any>),
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            (PropValue::Any(a), PropValue::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(value) => write!(f, "Bool({value})"),
            PropValue::Number(value) => write!(f, "Number({value})"),
            PropValue::Text(value) => write!(f, "Text({value:?})"),
            PropValue::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

/// Ordered prop map. Insertion order is preserved so renderer backends
/// observe attributes in the order the element declared them.
#[derive(Clone, Default)]
pub struct Props {
    entries: IndexMap<String, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// The closed set of element kinds the reconciler understands.
///
/// The primitive variants exist so that plain text, numbers and booleans
/// can occupy tree positions of their own; node conversion wraps them
/// into canonical elements before diffing.
#[derive(Clone)]
pub enum ElementKind {
    /// A renderer-defined node addressed by tag.
    Host(Rc<str>),
    /// A component function, compared by function identity.
    Component(ComponentFn),
    /// A context provider for the named context.
    Provider(ContextId),
    /// An error boundary: catches failures thrown below it.
    Boundary,
    Text,
    Number,
    Bool,
    Empty,
    Fragment,
}

impl ElementKind {
    /// Compatibility test used during child matching. Two provider
    /// elements always match (the context id travels in the props, and a
    /// provider commit can switch contexts only by being recreated
    /// through its key).
    pub fn same_kind(&self, other: &Self) -> bool {
        match (self, other) {
            (ElementKind::Host(a), ElementKind::Host(b)) => a == b,
            (ElementKind::Component(a), ElementKind::Component(b)) => {
                Rc::ptr_eq(a, b)
            }
            (ElementKind::Provider(_), ElementKind::Provider(_)) => true,
            (ElementKind::Boundary, ElementKind::Boundary) => true,
            (ElementKind::Text, ElementKind::Text) => true,
            (ElementKind::Number, ElementKind::Number) => true,
            (ElementKind::Bool, ElementKind::Bool) => true,
            (ElementKind::Empty, ElementKind::Empty) => true,
            (ElementKind::Fragment, ElementKind::Fragment) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ElementKind::Host(tag) => tag,
            ElementKind::Component(_) => "component",
            ElementKind::Provider(_) => "provider",
            ElementKind::Boundary => "boundary",
            ElementKind::Text => "text",
            ElementKind::Number => "number",
            ElementKind::Bool => "bool",
            ElementKind::Empty => "empty",
            ElementKind::Fragment => "fragment",
        }
    }
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct ElementInner {
    id: ElementId,
    kind: ElementKind,
    key: Option<Key>,
    props: Props,
    children: Node,
}

/// One immutable element. Cheap to clone; the inner value is shared.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl Element {
    pub fn new(kind: ElementKind, props: Props, children: Node) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                id: ElementId::next(),
                kind,
                key: None,
                props,
                children,
            }),
        }
    }

    pub fn host(tag: impl Into<String>, props: Props, children: impl Into<Node>) -> Self {
        let tag: Rc<str> = tag.into().into();
        Self::new(ElementKind::Host(tag), props, children.into())
    }

    pub fn component(func: ComponentFn, props: Props, children: impl Into<Node>) -> Self {
        Self::new(ElementKind::Component(func), props, children.into())
    }

    pub fn boundary(children: impl Into<Node>) -> Self {
        Self::new(ElementKind::Boundary, Props::new(), children.into())
    }

    pub(crate) fn provider(
        context: ContextId,
        value: PropValue,
        children: Node,
    ) -> Self {
        let props = Props::new().with("value", value);
        Self::new(ElementKind::Provider(context), props, children)
    }

    fn text(value: &str) -> Self {
        let props = Props::new().with("value", value);
        Self::new(ElementKind::Text, props, Node::Empty)
    }

    fn number(value: f64) -> Self {
        let props = Props::new().with("value", value);
        Self::new(ElementKind::Number, props, Node::Empty)
    }

    fn bool(value: bool) -> Self {
        let props = Props::new().with("value", value);
        Self::new(ElementKind::Bool, props, Node::Empty)
    }

    fn empty() -> Self {
        Self::new(ElementKind::Empty, Props::new(), Node::Empty)
    }

    pub(crate) fn fragment(children: Node) -> Self {
        Self::new(ElementKind::Fragment, Props::new(), children)
    }

    /// Attach an explicit reconciliation key. The element keeps its id;
    /// only the matching rule changes.
    pub fn keyed(self, key: impl Hash) -> Self {
        let key = hash::hash_one(&key);
        Self {
            inner: Rc::new(ElementInner {
                id: self.inner.id,
                kind: self.inner.kind.clone(),
                key: Some(key),
                props: self.inner.props.clone(),
                children: self.inner.children.clone(),
            }),
        }
    }

    pub fn id(&self) -> ElementId {
        self.inner.id
    }

    pub fn kind(&self) -> &ElementKind {
        &self.inner.kind
    }

    pub fn key(&self) -> Option<Key> {
        self.inner.key
    }

    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    pub fn children(&self) -> &Node {
        &self.inner.children
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("key", &self.inner.key)
            .finish_non_exhaustive()
    }
}

/// A node: anything a component may return or pass as children.
///
/// The set is closed, so a malformed node is unrepresentable; the only
/// historical failure class left at conversion time is "nothing at all",
/// which is just [`Node::Empty`].
#[derive(Clone, Debug)]
pub enum Node {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Element(Element),
    Fragment(Vec<Node>),
}

impl Node {
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Text(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Number(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Number(value as f64)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Fragment(nodes)
    }
}

/// Wrap one node into its canonical element.
fn convert_single(node: &Node) -> Element {
    match node {
        Node::Empty => Element::empty(),
        Node::Text(value) => Element::text(value),
        Node::Number(value) => Element::number(*value),
        Node::Bool(value) => Element::bool(*value),
        Node::Element(element) => element.clone(),
        Node::Fragment(children) => {
            Element::fragment(Node::Fragment(children.clone()))
        }
    }
}

/// Flatten a node into the ordered element list diffing operates on.
/// A top level fragment contributes one element per entry; nested
/// fragments become fragment elements that flatten at their own level.
/// A bare `Empty` contributes nothing, which is what terminates the
/// walk at leaves (primitive elements carry `Empty` children).
pub fn convert_node_to_elements(node: &Node) -> Vec<Element> {
    match node {
        Node::Empty => Vec::new(),
        Node::Fragment(children) => children.iter().map(convert_single).collect(),
        other => vec![convert_single(other)],
    }
}
