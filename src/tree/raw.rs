/// Interchange shape of the external parser's output
///
/// The parser hands over an element tree (tag, text, tail, children), the
/// same shape as an fxtran XML document with namespaces stripped. It is read
/// and written as JSON through serde.
use serde::{Deserialize, Serialize};

use super::{NodeId, Tree};

/// One element of the parser output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawNode>,
}

impl RawNode {
    /// Element without children
    #[must_use]
    pub fn leaf(tag: &str, text: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: text.to_string(),
            ..Self::default()
        }
    }
}

impl Tree {
    /// Build an arena tree from parser output
    #[must_use]
    pub fn from_raw(raw: &RawNode) -> Self {
        let mut tree = Tree::new(&raw.tag);
        let root = tree.root();
        tree.set_text(root, raw.text.clone());
        tree.set_tail(root, raw.tail.clone());
        for child in &raw.children {
            tree.push_raw(root, child);
        }
        tree
    }

    fn push_raw(&mut self, parent: NodeId, raw: &RawNode) {
        let id = self.new_node(&raw.tag);
        self.set_text(id, raw.text.clone());
        self.set_tail(id, raw.tail.clone());
        self.append_child(parent, id);
        for child in &raw.children {
            self.push_raw(id, child);
        }
    }

    /// Export the attached tree in parser shape
    #[must_use]
    pub fn to_raw(&self) -> RawNode {
        self.raw_node(self.root())
    }

    fn raw_node(&self, id: NodeId) -> RawNode {
        RawNode {
            tag: self.tag(id).to_string(),
            text: self.text(id).to_string(),
            tail: self.tail(id).to_string(),
            children: self.children(id).iter().map(|&c| self.raw_node(c)).collect(),
        }
    }
}
