/// `TreeBuilder` - Event-style tree construction
///
/// Mirrors how a streaming parser emits a CST: open an element, feed text,
/// close it. Text fed while the open node has no children is its leading
/// text; after a child has been closed it becomes that child's tail.
use super::{NodeId, Tree};

pub struct TreeBuilder {
    tree: Tree,
    /// Open nodes, innermost last; never empty
    open: Vec<NodeId>,
}

impl TreeBuilder {
    /// Start a tree whose root has the given tag
    #[must_use]
    pub fn new(root_tag: &str) -> Self {
        let tree = Tree::new(root_tag);
        let root = tree.root();
        Self {
            tree,
            open: vec![root],
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.tree.root())
    }

    /// Open a child of the current node
    pub fn start(&mut self, tag: &str) -> &mut Self {
        let parent = self.current();
        let id = self.tree.new_node(tag);
        self.tree.append_child(parent, id);
        self.open.push(id);
        self
    }

    /// Feed raw source text at the current position
    pub fn text(&mut self, text: &str) -> &mut Self {
        let current = self.current();
        match self.tree.last_child(current) {
            Some(last) => self.tree.tail_mut(last).push_str(text),
            None => self.tree.text_mut(current).push_str(text),
        }
        self
    }

    /// Close the current node (the root is never closed)
    pub fn finish(&mut self) -> &mut Self {
        if self.open.len() > 1 {
            self.open.pop();
        }
        self
    }

    /// Shorthand for `start(tag).text(text).finish()`
    pub fn leaf(&mut self, tag: &str, text: &str) -> &mut Self {
        self.start(tag).text(text).finish()
    }

    /// Finish building; nodes still open are closed implicitly
    #[must_use]
    pub fn build(self) -> Tree {
        self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    #[test]
    fn test_text_goes_to_text_then_tail() {
        let mut b = TreeBuilder::new("file");
        b.start("call-stmt")
            .text("CALL ")
            .start("procedure-designator")
            .leaf("N", "FOO")
            .finish()
            .text("()")
            .finish()
            .text("\n");
        let tree = b.build();

        assert_eq!(tree.to_source(), "CALL FOO()\n");
        let stmt = tree.children(tree.root())[0];
        assert_eq!(tree.kind(stmt), NodeKind::CallStmt);
        assert_eq!(tree.text(stmt), "CALL ");
        assert_eq!(tree.tail(stmt), "\n");
        let designator = tree.children(stmt)[0];
        assert_eq!(tree.tail(designator), "()");
    }

    #[test]
    fn test_root_is_never_closed() {
        let mut b = TreeBuilder::new("file");
        b.finish().finish().leaf("C", "! x");
        let tree = b.build();
        assert_eq!(tree.children(tree.root()).len(), 1);
    }
}
