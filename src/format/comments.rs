/// Comment removal
///
/// Removed comments give their tail back to the tree so that line breaks
/// and indentation survive: to the previous sibling's tail, or to the
/// parent's leading text for a first child.
use serde::{Deserialize, Serialize};

use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommentOptions {
    /// Comment prefixes marking directive lines that must be kept
    pub excluded_directives: Vec<String>,
}

impl Default for CommentOptions {
    fn default() -> Self {
        Self {
            excluded_directives: vec!["!$OMP".to_string(), "!$mnh".to_string()],
        }
    }
}

/// Remove every comment except those starting with an excluded prefix
///
/// Preprocessor directives are not comments and are never removed.
/// Returns the number of comments removed.
#[tracing::instrument(level = "debug", skip_all)]
pub fn remove_comments(tree: &mut Tree, options: &CommentOptions) -> usize {
    let root = tree.root();
    let removed = strip(tree, root, options);
    tracing::debug!(removed, "comments removed");
    removed
}

fn strip(tree: &mut Tree, elem: NodeId, options: &CommentOptions) -> usize {
    let mut removed = 0;
    let children = tree.children(elem).to_vec();
    // Last to first so that tails merge into siblings that are still there
    for &child in children.iter().rev() {
        if tree.kind(child) == NodeKind::Comment && !is_kept(tree.text(child), options) {
            tracing::trace!(comment = tree.text(child), "removing comment");
            tree.remove_child(elem, child);
            removed += 1;
        } else if tree.has_children(child) {
            removed += strip(tree, child, options);
        }
    }
    removed
}

fn is_kept(text: &str, options: &CommentOptions) -> bool {
    options
        .excluded_directives
        .iter()
        .any(|d| text.starts_with(d.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tails_survive() {
        let mut b = TreeBuilder::new("file");
        b.start("program-unit")
            .leaf("subroutine-stmt", "SUBROUTINE S")
            .text(" ")
            .leaf("C", "! header")
            .text("\n  ")
            .leaf("C", "! body")
            .text("\n  ")
            .leaf("a-stmt", "X=1")
            .text("\n")
            .leaf("end-subroutine-stmt", "END SUBROUTINE")
            .finish();
        let mut tree = b.build();
        assert_eq!(remove_comments(&mut tree, &CommentOptions::default()), 2);
        assert_eq!(tree.to_source(), "SUBROUTINE S \n  \n  X=1\nEND SUBROUTINE");
    }

    #[test]
    fn test_first_child_tail_goes_to_parent_text() {
        let mut b = TreeBuilder::new("file");
        b.start("do-construct")
            .leaf("C", "! leading")
            .text("\n")
            .leaf("do-stmt", "DO")
            .text("\n")
            .leaf("end-do-stmt", "ENDDO")
            .finish();
        let mut tree = b.build();
        remove_comments(&mut tree, &CommentOptions::default());
        let construct = tree.children(tree.root())[0];
        assert_eq!(tree.text(construct), "\n");
        assert_eq!(tree.to_source(), "\nDO\nENDDO");
    }

    #[test]
    fn test_directives_and_excluded_prefixes_kept() {
        let mut b = TreeBuilder::new("file");
        b.leaf("C", "!$OMP PARALLEL")
            .text("\n")
            .leaf("C", "!$mnh expand")
            .text("\n")
            .leaf("cpp", "#ifdef A")
            .text("\n")
            .leaf("C", "! plain")
            .text("\n");
        let mut tree = b.build();
        assert_eq!(remove_comments(&mut tree, &CommentOptions::default()), 1);
        assert_eq!(tree.to_source(), "!$OMP PARALLEL\n!$mnh expand\n#ifdef A\n\n");

        let none = CommentOptions {
            excluded_directives: Vec::new(),
        };
        assert_eq!(remove_comments(&mut tree, &none), 2);
        assert_eq!(tree.to_source(), "\n\n#ifdef A\n\n");
    }
}
