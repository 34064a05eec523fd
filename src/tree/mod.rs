//! Concrete syntax tree model.
//!
//! The tree is an arena of [`Node`]s addressed by [`NodeId`]. Every run of
//! source text belongs to exactly one node, either as its leading `text`
//! (before its first child) or as its `tail` (after its end, before the next
//! sibling). Serializing the tree in document order gives back the source.
//!
//! - [`kind`]: closed classification of upstream tags
//! - [`builder`]: event-style construction (`start` / `text` / `finish`)
//! - [`raw`]: serde interchange shape produced by the external parser

pub mod builder;
pub mod kind;
pub mod raw;

use std::cell::OnceCell;
use std::io::{self, Write};

pub use builder::TreeBuilder;
pub use kind::{BlockFamily, Construct, NodeKind, Unit};
pub use raw::RawNode;

/// Handle into a [`Tree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single CST node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Upstream tag, kept verbatim for lossless export
    tag: String,
    /// Classification of `tag`
    kind: NodeKind,
    /// Text before the first child
    text: String,
    /// Text after the node, before the next sibling
    tail: String,
    children: Vec<NodeId>,
}

/// Which siblings [`Tree::siblings`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// Arena-backed concrete syntax tree
///
/// Nodes removed from the tree stay in the arena, detached, until the tree
/// is dropped. The parent relation is not stored on nodes: it is computed by
/// one scan on first use and dropped on every structural edit.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    parents: OnceCell<Vec<Option<NodeId>>>,
    cache_parents: bool,
}

impl Tree {
    /// Create a tree holding only a root node
    #[must_use]
    pub fn new(root_tag: &str) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            parents: OnceCell::new(),
            cache_parents: true,
        };
        tree.root = tree.new_node(root_tag);
        tree
    }

    /// Allocate a detached node
    pub fn new_node(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_string(),
            kind: NodeKind::from_tag(tag),
            text: String::new(),
            tail: String::new(),
            children: Vec::new(),
        });
        id
    }

    /// Allocate a detached node with leading text
    pub fn new_leaf(&mut self, tag: &str, text: &str) -> NodeId {
        let id = self.new_node(tag);
        self.nodes[id.0].text = text.to_string();
        id
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Enable or disable the parent index
    ///
    /// With the index disabled, every [`Tree::parent`] call walks the tree
    /// from the root.
    pub fn set_parent_cache(&mut self, enabled: bool) {
        self.cache_parents = enabled;
        self.invalidate_parents();
    }

    // ===== Accessors =====

    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    #[must_use]
    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    #[must_use]
    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id.0].text
    }

    #[must_use]
    pub fn tail(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tail
    }

    pub fn text_mut(&mut self, id: NodeId) -> &mut String {
        &mut self.nodes[id.0].text
    }

    pub fn tail_mut(&mut self, id: NodeId) -> &mut String {
        &mut self.nodes[id.0].tail
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = text.into();
    }

    pub fn set_tail(&mut self, id: NodeId, tail: impl Into<String>) {
        self.nodes[id.0].tail = tail.into();
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[must_use]
    pub fn has_children(&self, id: NodeId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.last().copied()
    }

    /// First direct child of the given kind
    #[must_use]
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.kind(c) == kind)
    }

    /// First descendant (excluding `id`) of the given kind, in document order
    #[must_use]
    pub fn find_descendant(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .skip(1)
            .find(|&d| self.kind(d) == kind)
    }

    // ===== Structural edits =====

    /// Insert `child` at `index` (clamped to the child count)
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.invalidate_parents();
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.invalidate_parents();
    }

    /// Unlink `child` from `parent` without touching any text
    ///
    /// The node keeps its own tail. Returns the index it occupied.
    pub fn detach(&mut self, parent: NodeId, child: NodeId) -> Option<usize> {
        let children = &mut self.nodes[parent.0].children;
        let index = children.iter().position(|&c| c == child)?;
        children.remove(index);
        self.invalidate_parents();
        Some(index)
    }

    /// Remove `child` from `parent`, keeping its tail in the tree
    ///
    /// The tail is appended to the previous sibling's tail, or to the
    /// parent's leading text when `child` was the first child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Option<usize> {
        let index = self.detach(parent, child)?;
        let tail = std::mem::take(&mut self.nodes[child.0].tail);
        self.append_trivia_before(parent, index, &tail);
        Some(index)
    }

    /// Append `trivia` to whatever text precedes position `index` of `parent`
    pub fn append_trivia_before(&mut self, parent: NodeId, index: usize, trivia: &str) {
        if trivia.is_empty() {
            return;
        }
        if index == 0 {
            self.nodes[parent.0].text.push_str(trivia);
        } else {
            let prev = self.nodes[parent.0].children[index - 1];
            self.nodes[prev.0].tail.push_str(trivia);
        }
    }

    /// Re-tag a node, recomputing its kind
    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        let node = &mut self.nodes[id.0];
        node.tag = tag.to_string();
        node.kind = NodeKind::from_tag(tag);
        self.invalidate_parents();
    }

    fn invalidate_parents(&mut self) {
        self.parents.take();
    }

    // ===== Navigation =====

    /// Parent of `id`, or `None` for the root and detached nodes
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        if self.cache_parents {
            // Nodes allocated after the scan are detached
            self.parents
                .get_or_init(|| self.scan_parents())
                .get(id.0)
                .copied()
                .flatten()
        } else {
            self.descendants(self.root)
                .into_iter()
                .find(|&p| self.children(p).contains(&id))
        }
    }

    fn scan_parents(&self) -> Vec<Option<NodeId>> {
        let mut parents = vec![None; self.nodes.len()];
        for id in self.descendants(self.root) {
            for &child in self.children(id) {
                parents[child.0] = Some(id);
            }
        }
        parents
    }

    /// Position of `id` among its parent's children
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    /// Siblings before (document order) or after `id`
    #[must_use]
    pub fn siblings(&self, id: NodeId, side: Side) -> Vec<NodeId> {
        let Some((parent, index)) = self.index_in_parent(id) else {
            return Vec::new();
        };
        let children = self.children(parent);
        match side {
            Side::Before => children[..index].to_vec(),
            Side::After => children[index + 1..].to_vec(),
        }
    }

    /// `id` and every node below it, in document order
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Every attached node, in document order
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// Whether `id` has a descendant (excluding itself) of the given kind
    #[must_use]
    pub fn contains_kind(&self, id: NodeId, kind: NodeKind) -> bool {
        self.find_descendant(id, kind).is_some()
    }

    // ===== Serialization =====

    /// Source text of the whole tree
    #[must_use]
    pub fn to_source(&self) -> String {
        self.subtree_source(self.root)
    }

    /// Source text of one node: text, children, tail
    #[must_use]
    pub fn subtree_source(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.push_source(id, &mut out);
        out
    }

    fn push_source(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        out.push_str(&node.text);
        for &child in &node.children {
            self.push_source(child, out);
        }
        out.push_str(&node.tail);
    }

    /// Stream the source text of the tree
    pub fn write_source<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.write_node(self.root, writer)
    }

    fn write_node<W: Write>(&self, id: NodeId, writer: &mut W) -> io::Result<()> {
        let node = &self.nodes[id.0];
        writer.write_all(node.text.as_bytes())?;
        for &child in &node.children {
            self.write_node(child, writer)?;
        }
        writer.write_all(node.tail.as_bytes())
    }
}
