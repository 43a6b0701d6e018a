//! The node arena: `Tree` owns every node; nodes refer to each other by
//! `NodeId` rather than by pointer, so the tree has no cycles and is
//! trivially `Send + Sync` once built (§5, §9 "Node parent links").

use smol_str::SmolStr;
use std::fmt;

/// Index into a `Tree`'s node table. Never valid across two different
/// trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An expanded (namespace-resolved) name. `ns_uri` is `None` for the
/// null namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QName {
    pub prefix: Option<SmolStr>,
    pub ns_uri: Option<SmolStr>,
    pub local: SmolStr,
}

impl QName {
    pub fn new(local: impl Into<SmolStr>) -> Self {
        QName { prefix: None, ns_uri: None, local: local.into() }
    }

    pub fn with_ns(prefix: Option<SmolStr>, ns_uri: Option<SmolStr>, local: impl Into<SmolStr>) -> Self {
        QName { prefix, ns_uri, local: local.into() }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// The seven XDM node kinds (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Namespace,
    Comment,
    ProcessingInstruction,
}

/// The typed value an Attribute or Element may carry once schema
/// annotation has run (§3.2). Untyped nodes carry `None`; the untyped
/// string value is always derivable from `NodeData::string_value`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Boolean(bool),
    Double(f64),
    Integer(i64),
    /// A sequence of atomic values, for list-typed (e.g. IDREFS) content.
    Sequence(Vec<TypedValue>),
}

/// Per-kind payload plus the tree-structural fields shared by every node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    /// `None` only for the tree root.
    pub parent: Option<NodeId>,
    /// Document-order position, strictly increasing in a pre-order walk
    /// of the host tree; attribute/namespace nodes sort after their
    /// owning element's start and before its first child (§3.2).
    pub position: u32,

    // Element / Document
    pub name: Option<QName>,
    /// Ordinary (child-axis) children: for Element, other Elements,
    /// Text, Comment, ProcessingInstruction nodes, in host order. For
    /// Document, the root Element plus any lxml-style leading/trailing
    /// Comment/ProcessingInstruction siblings.
    pub children: Vec<NodeId>,
    /// attribute-axis only, not child-axis (§3.2 invariant).
    pub attributes: Vec<NodeId>,
    /// namespace-axis only, not child-axis (§3.2 invariant).
    pub namespaces: Vec<NodeId>,
    /// Set when this element was built via `build_schema_node_tree`;
    /// traversal for such nodes follows XSD particle structure rather
    /// than document structure (§3.2 "SchemaElementNode").
    pub is_schema_node: bool,

    // Attribute / Namespace
    pub value: Option<String>,

    // Comment / ProcessingInstruction
    pub pi_target: Option<String>,

    pub typed_value: Option<TypedValue>,
}

impl NodeData {
    fn leaf(kind: NodeKind, parent: NodeId, position: u32) -> Self {
        NodeData {
            kind,
            parent: Some(parent),
            position,
            name: None,
            children: Vec::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            is_schema_node: false,
            value: None,
            pi_target: None,
            typed_value: None,
        }
    }
}

/// An immutable, fully-built node tree. `Tree` never changes after
/// `build::build_node_tree` (or a sibling builder) returns, so it is
/// safely `Send + Sync` as long as callers do not mutate the host tree
/// underneath it concurrently (§5).
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    pub(crate) fn new(nodes: Vec<NodeData>, root: NodeId) -> Self {
        Tree { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn position(&self, id: NodeId) -> u32 {
        self.node(id).position
    }

    /// Document-order comparison (§3.2 "Document order is a total
    /// order"). Both ids must belong to this tree.
    pub fn order(&self, a: NodeId, b: NodeId) -> std::cmp::Ordering {
        self.position(a).cmp(&self.position(b))
    }

    pub fn is_before(&self, a: NodeId, b: NodeId) -> bool {
        self.position(a) < self.position(b)
    }

    /// The string value of a node, per the XDM dm:string-value accessor:
    /// Text/Comment/PI/Attribute/Namespace return their literal content;
    /// Element/Document concatenate the string value of every descendant
    /// Text node in document order.
    pub fn string_value(&self, id: NodeId) -> String {
        let data = self.node(id);
        match data.kind {
            NodeKind::Text | NodeKind::Comment | NodeKind::Attribute | NodeKind::Namespace => {
                data.value.clone().unwrap_or_default()
            }
            NodeKind::ProcessingInstruction => data.value.clone().unwrap_or_default(),
            NodeKind::Element | NodeKind::Document => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let data = self.node(id);
        match data.kind {
            NodeKind::Text => out.push_str(data.value.as_deref().unwrap_or("")),
            NodeKind::Element | NodeKind::Document => {
                for &child in &data.children {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// The typed value if schema-annotated, else the untyped string
    /// value wrapped as `TypedValue::String` (§3.2).
    pub fn typed_value(&self, id: NodeId) -> TypedValue {
        let data = self.node(id);
        data.typed_value
            .clone()
            .unwrap_or_else(|| TypedValue::String(self.string_value(id)))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).attributes
    }

    pub fn namespaces(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).namespaces
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.node(id).name.as_ref()
    }
}

/// Builder-internal helper: appends a node and returns its id. Kept in
/// this module since `NodeData`'s fields are only constructible here.
pub(crate) struct Arena {
    pub nodes: Vec<NodeData>,
    pub next_position: u32,
}

impl Arena {
    pub fn new() -> Self {
        Arena { nodes: Vec::new(), next_position: 0 }
    }

    pub fn alloc_root(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let position = self.next_position;
        self.next_position += 1;
        self.nodes.push(NodeData {
            kind,
            parent: None,
            position,
            name: None,
            children: Vec::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            is_schema_node: false,
            value: None,
            pi_target: None,
            typed_value: None,
        });
        id
    }

    pub fn alloc(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let position = self.next_position;
        self.next_position += 1;
        self.nodes.push(NodeData::leaf(kind, parent, position));
        id
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub fn finish(self, root: NodeId) -> Tree {
        Tree::new(self.nodes, root)
    }
}
