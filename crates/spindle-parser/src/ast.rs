//! Abstract Syntax Tree for parsed patterns.
//!
//! Nodes live in an arena owned by the `Document` and are addressed by
//! `NodeId`. Ownership always runs parent → children through the arena;
//! the `parent` link is a plain id used for lookups only.

use crate::position::{Location, Position, SourceLabel};
use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::Hash;

/// A dialect's token kind.
///
/// Usually a fieldless enum fixed at compile time by the dialect.
pub trait Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display {}

impl<T> Kind for T where T: Copy + Eq + Hash + fmt::Debug + fmt::Display {}

/// Opaque handle to a node in a `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// The semantic role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind<K> {
    /// The document root.
    Root,
    /// End-of-stream sentinel, appended as the root's last child.
    Eos,
    /// A simple token produced by a capture rule or a middleware.
    Token(K),
    /// Container for a pair construct. Holds the open node, the contents,
    /// and the close node once one is seen.
    Group(K),
    /// The opening token of a pair construct.
    Open(K),
    /// The closing token of a pair construct.
    Close(K),
}

impl<K: Kind> NodeKind<K> {
    /// The dialect kind behind this node, if any.
    pub fn dialect(&self) -> Option<K> {
        match *self {
            NodeKind::Token(k) | NodeKind::Group(k) | NodeKind::Open(k) | NodeKind::Close(k) => {
                Some(k)
            }
            NodeKind::Root | NodeKind::Eos => None,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Eos | NodeKind::Group(_))
    }
}

impl<K: Kind> fmt::Display for NodeKind<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Root => f.write_str("root"),
            NodeKind::Eos => f.write_str("eos"),
            NodeKind::Token(k) | NodeKind::Group(k) => write!(f, "{k}"),
            NodeKind::Open(k) => write!(f, "{k}.open"),
            NodeKind::Close(k) => write!(f, "{k}.close"),
        }
    }
}

/// A single AST node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<K> {
    pub kind: NodeKind<K>,
    /// The exact text consumed for this node. Empty for structural nodes.
    pub raw: String,
    /// Text captured ahead of an opener, e.g. the `!` in `!(a|b)`.
    pub prefix: Option<String>,
    /// Text captured alongside a closer.
    pub suffix: Option<String>,
    pub position: Position,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    created: Option<Snapshot>,
}

/// Cursor and input length at the moment a node was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    cursor: usize,
    horizon: usize,
}

impl<K: Kind> Node<K> {
    pub fn new(kind: NodeKind<K>, raw: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            raw: raw.into(),
            prefix: None,
            suffix: None,
            position,
            parent: None,
            children: Vec::new(),
            created: None,
        }
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_suffix(mut self, suffix: Option<String>) -> Self {
        self.suffix = suffix;
        self
    }

    /// Records the cursor and how much input existed when the node was
    /// created, so that `Document::remaining_after` reflects that moment even
    /// after more input is fed. Groups are created after their opener is
    /// consumed, so their cursor lies past their zero-width position.
    pub(crate) fn created_at(mut self, cursor: usize, horizon: usize) -> Self {
        self.created = Some(Snapshot { cursor, horizon });
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is(&self, kind: NodeKind<K>) -> bool {
        self.kind == kind
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A non-fatal parse problem collected in `ErrorMode::Collect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: Location,
    pub source: SourceLabel,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source, self.location, self.message)
    }
}

/// A parsed document: the node arena, the source it came from, and any
/// collected diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<K> {
    nodes: Vec<Node<K>>,
    source: String,
    label: SourceLabel,
    errors: Vec<Diagnostic>,
}

impl<K: Kind> Document<K> {
    /// An empty document holding only the root.
    pub fn new(label: SourceLabel) -> Self {
        let root = Node::new(
            NodeKind::Root,
            "",
            Position::point(Location::start(), label.clone()),
        );
        Self {
            nodes: vec![root],
            source: String::new(),
            label,
            errors: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Look up a node.
    ///
    /// Panics if `id` did not come from this document.
    pub fn node(&self, id: NodeId) -> &Node<K> {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<K>> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// The root's children, in insertion order.
    pub fn top_level(&self) -> &[NodeId] {
        self.children(NodeId::ROOT)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// The children of `id`'s parent, including `id`. Empty for the root.
    pub fn siblings(&self, id: NodeId) -> &[NodeId] {
        match self.parent(id) {
            Some(parent) => self.children(parent),
            None => &[],
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        self.siblings(id).iter().position(|s| *s == id)
    }

    /// Number of ancestors between `id` and the root. The root is at depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Whether a group node has received its close node.
    pub fn is_closed(&self, id: NodeId) -> bool {
        let node = self.node(id);
        match node.kind {
            NodeKind::Group(kind) => self
                .last_child(id)
                .is_some_and(|last| self.node(last).kind == NodeKind::Close(kind)),
            _ => false,
        }
    }

    /// Append `node` as the last child of `parent` and return its id.
    ///
    /// This is the only way to attach a node, so every non-root node gets
    /// exactly one parent, set once.
    pub fn append(&mut self, parent: NodeId, mut node: Node<K>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Node ids in document order (pre-order), excluding the root.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.top_level().iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.children(id).iter().rev().copied());
            Some(id)
        })
    }

    /// The full input fed to the parser.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn label(&self) -> &SourceLabel {
        &self.label
    }

    /// Text the parser had consumed before `id` was matched.
    pub fn consumed_before(&self, id: NodeId) -> &str {
        let start = self.node(id).position.start.offset.min(self.source.len());
        &self.source[..start]
    }

    /// Text not yet consumed at the moment `id` was created.
    pub fn remaining_after(&self, id: NodeId) -> &str {
        let node = self.node(id);
        let len = self.source.len();
        let end = node.position.end.offset.min(len);
        let (from, horizon) = match node.created {
            Some(snapshot) => (snapshot.cursor.clamp(end, len), snapshot.horizon.min(len)),
            None => (end, len),
        };
        &self.source[from..horizon.max(from)]
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn push_source(&mut self, chunk: &str) {
        self.source.push_str(chunk);
    }

    pub(crate) fn push_error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }
}

// ---------------------------------------------------------------------------
// Serialization: the arena is written out as a nested tree.
// ---------------------------------------------------------------------------

struct Subtree<'a, K> {
    doc: &'a Document<K>,
    id: NodeId,
}

struct Children<'a, K> {
    doc: &'a Document<K>,
    ids: &'a [NodeId],
}

impl<K: Kind> Serialize for Subtree<'_, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.doc.node(self.id);
        let mut state = serializer.serialize_struct("Node", 6)?;
        state.serialize_field("type", &node.kind.to_string())?;
        state.serialize_field("value", &node.raw)?;
        state.serialize_field("prefix", &node.prefix)?;
        state.serialize_field("suffix", &node.suffix)?;
        state.serialize_field("position", &node.position)?;
        state.serialize_field(
            "nodes",
            &Children {
                doc: self.doc,
                ids: &node.children,
            },
        )?;
        state.end()
    }
}

impl<K: Kind> Serialize for Children<'_, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.ids.len()))?;
        for id in self.ids {
            seq.serialize_element(&Subtree {
                doc: self.doc,
                id: *id,
            })?;
        }
        seq.end()
    }
}

impl<K: Kind> Serialize for Document<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Document", 4)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("label", &self.label)?;
        state.serialize_field(
            "nodes",
            &Children {
                doc: self,
                ids: self.top_level(),
            },
        )?;
        state.serialize_field("errors", &self.errors)?;
        state.end()
    }
}
