/// Structural rewrites
///
/// - One-line IF statements become IF constructs
/// - CONTAINS sections with nothing in them are dropped
/// - Blank lines are removed
///
/// These edits change the tree shape; indentation and spacing should be
/// run again afterwards for a tidy result.
use crate::format::patterns::{spaces, BLANK_LINES_RE};
use crate::tree::{NodeId, NodeKind, Tree, Unit};

/// Convert `IF (cond) action` into an IF construct
///
/// ```text
/// IF (A) PRINT*, X        IF (A) THEN
///                    =>     PRINT*, X
///                         END IF
/// ```
///
/// With `single`, only that `if-stmt` is converted; `parent` may be given to
/// skip the parent lookup. Statements whose action contains a CYCLE are left
/// alone. Returns the number of statements converted.
#[tracing::instrument(level = "debug", skip_all)]
pub fn convert_if_statements(
    tree: &mut Tree,
    single: Option<NodeId>,
    parent: Option<NodeId>,
) -> usize {
    let items: Vec<NodeId> = match single {
        Some(item) => vec![item],
        None => tree
            .preorder()
            .into_iter()
            .filter(|&id| tree.kind(id) == NodeKind::IfStmt)
            .collect(),
    };

    let mut converted = 0;
    for item in items {
        if tree.kind(item) != NodeKind::IfStmt || tree.contains_kind(item, NodeKind::CycleStmt) {
            continue;
        }
        let known_parent = if single.is_some() { parent } else { None };
        if convert_one(tree, item, known_parent) {
            converted += 1;
        }
    }
    tracing::debug!(converted, "IF statements converted");
    converted
}

/// Blanks at the end of the tail preceding `item`: the indentation of its line
fn current_indent(tree: &Tree, item: NodeId, parent: Option<NodeId>) -> usize {
    let located = match parent {
        Some(p) => tree
            .children(p)
            .iter()
            .position(|&c| c == item)
            .map(|i| (p, i)),
        None => tree.index_in_parent(item),
    };
    match located {
        Some((p, i)) if i > 0 => {
            let tail = tree.tail(tree.children(p)[i - 1]);
            tail.len() - tail.trim_end_matches(' ').len()
        }
        _ => 0,
    }
}

fn convert_one(tree: &mut Tree, item: NodeId, parent: Option<NodeId>) -> bool {
    let Some(condition) = tree.child_of_kind(item, NodeKind::Condition) else {
        return false;
    };
    let Some(action) = tree.child_of_kind(item, NodeKind::ActionStmt) else {
        return false;
    };
    let Some(statement) = tree.first_child(action) else {
        return false;
    };
    let indent = current_indent(tree, item, parent);

    tree.set_tag(item, "if-construct");
    let block = tree.new_node("if-block");
    let header = tree.new_node("if-then-stmt");
    let end = tree.new_leaf("end-if-stmt", "END IF");

    // Header: the old leading text, the condition and THEN
    let opening = std::mem::take(tree.text_mut(item));
    tree.set_text(header, opening);
    tree.set_tail(header, format!("\n{}", spaces(indent + 2)));
    tree.detach(item, condition);
    let condition_tail = tree.tail_mut(condition);
    if !condition_tail.ends_with(' ') {
        condition_tail.push(' ');
    }
    condition_tail.push_str("THEN");
    tree.append_child(header, condition);

    // Body: the action statement, followed by the END IF line
    tree.detach(item, action);
    tree.detach(action, statement);
    tree.set_tail(statement, format!("\n{}", spaces(indent)));

    tree.append_child(block, header);
    tree.append_child(block, statement);
    tree.append_child(block, end);

    // Markers continued the one-line form; the newline after THEN replaces them
    let markers: Vec<NodeId> = tree
        .children(item)
        .iter()
        .copied()
        .filter(|&c| tree.kind(c) == NodeKind::Continuation)
        .collect();
    for marker in markers {
        tree.detach(item, marker);
    }
    tree.append_child(item, block);

    tracing::trace!(indent, "IF statement converted");
    true
}

/// Remove CONTAINS statements directly followed by the end of their unit
///
/// Comments between CONTAINS and the end statement are skipped. Interface
/// blocks are not program units with a CONTAINS section and are ignored.
/// Returns the number of statements removed.
#[tracing::instrument(level = "debug", skip_all)]
pub fn remove_empty_contains(tree: &mut Tree) -> usize {
    let contains: Vec<NodeId> = tree
        .preorder()
        .into_iter()
        .filter(|&id| tree.kind(id) == NodeKind::ContainsStmt)
        .collect();

    let mut removed = 0;
    for stmt in contains {
        let Some((parent, index)) = tree.index_in_parent(stmt) else {
            continue;
        };
        let next = tree.children(parent)[index + 1..]
            .iter()
            .copied()
            .find(|&c| tree.kind(c) != NodeKind::Comment);
        let empty = next.is_some_and(|n| {
            matches!(tree.kind(n), NodeKind::EndUnitStmt(unit) if unit != Unit::Interface)
        });
        if empty {
            tree.detach(parent, stmt);
            removed += 1;
        }
    }
    tracing::debug!(removed, "empty CONTAINS removed");
    removed
}

/// Remove blank lines
///
/// Newlines before the first statement go away entirely; elsewhere runs
/// of blank lines collapse into one line break. Returns the number of
/// texts changed.
#[tracing::instrument(level = "debug", skip_all)]
pub fn remove_empty_lines(tree: &mut Tree) -> usize {
    let mut changed = 0;

    let root = tree.root();
    let file = if tree.kind(root) == NodeKind::File {
        Some(root)
    } else {
        tree.find_descendant(root, NodeKind::File)
    };
    if let Some(file) = file {
        if tree.text(file).contains('\n') {
            let text = tree.text(file).replace('\n', "");
            tree.set_text(file, text);
            changed += 1;
        }
    }

    for id in tree.preorder() {
        if !tree.tail(id).contains('\n') {
            continue;
        }
        let expanded = tree.tail(id).replace('\t', "  ");
        let collapsed = BLANK_LINES_RE.replace_all(&expanded, "\n").into_owned();
        if collapsed != tree.tail(id) {
            tree.set_tail(id, collapsed);
            changed += 1;
        }
    }
    tracing::debug!(changed, "blank lines removed");
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Construct, TreeBuilder};
    use pretty_assertions::assert_eq;

    fn if_statement(action_tag: &str, action_text: &str) -> Tree {
        let mut b = TreeBuilder::new("file");
        b.start("do-construct")
            .leaf("do-stmt", "DO I=1,N")
            .text("\n  ")
            .start("if-stmt")
            .text("IF (")
            .leaf("condition-E", "A")
            .text(") ")
            .start("action-stmt")
            .leaf(action_tag, action_text)
            .finish()
            .finish()
            .text("\n")
            .leaf("end-do-stmt", "END DO")
            .finish()
            .text("\n");
        b.build()
    }

    #[test]
    fn test_convert_if_statement() {
        let mut tree = if_statement("print-stmt", "PRINT*,X");
        assert_eq!(convert_if_statements(&mut tree, None, None), 1);
        assert_eq!(
            tree.to_source(),
            "DO I=1,N\n  IF (A) THEN\n    PRINT*,X\n  END IF\nEND DO\n"
        );
        let construct = tree.find_descendant(tree.root(), NodeKind::Construct(Construct::If));
        assert!(construct.is_some());
        assert!(tree.find_descendant(tree.root(), NodeKind::IfStmt).is_none());
    }

    #[test]
    fn test_cycle_is_not_converted() {
        let mut tree = if_statement("cycle-stmt", "CYCLE");
        let before = tree.to_source();
        assert_eq!(convert_if_statements(&mut tree, None, None), 0);
        assert_eq!(tree.to_source(), before);
    }

    #[test]
    fn test_single_item_with_parent_and_markers() {
        let mut b = TreeBuilder::new("file");
        b.start("if-stmt")
            .text("IF(")
            .leaf("condition-E", "B")
            .text(")")
            .leaf("cnt", "&")
            .text("\n   ")
            .start("action-stmt")
            .leaf("call-stmt", "CALL F")
            .finish()
            .finish()
            .text("\n");
        let mut tree = b.build();
        let root = tree.root();
        let item = tree.children(root)[0];
        assert_eq!(convert_if_statements(&mut tree, Some(item), Some(root)), 1);
        assert_eq!(tree.to_source(), "IF(B) THEN\n  CALL F\nEND IF\n");
    }

    #[test]
    fn test_remove_empty_contains() {
        let mut b = TreeBuilder::new("file");
        b.start("program-unit")
            .leaf("module-stmt", "MODULE M")
            .text("\n")
            .leaf("contains-stmt", "CONTAINS")
            .text("\n")
            .leaf("C", "! nothing here")
            .text("\n")
            .leaf("end-module-stmt", "END MODULE")
            .finish()
            .text("\n");
        let mut tree = b.build();
        assert_eq!(remove_empty_contains(&mut tree), 1);
        assert_eq!(tree.to_source(), "MODULE M\n! nothing here\nEND MODULE\n");
    }

    #[test]
    fn test_contains_with_procedures_kept() {
        let mut b = TreeBuilder::new("file");
        b.start("program-unit")
            .leaf("module-stmt", "MODULE M")
            .text("\n")
            .leaf("contains-stmt", "CONTAINS")
            .text("\n")
            .start("program-unit")
            .leaf("subroutine-stmt", "SUBROUTINE S")
            .text("\n")
            .leaf("end-subroutine-stmt", "END SUBROUTINE")
            .finish()
            .text("\n")
            .leaf("end-module-stmt", "END MODULE")
            .finish();
        let mut tree = b.build();
        assert_eq!(remove_empty_contains(&mut tree), 0);
    }

    #[test]
    fn test_remove_empty_lines() {
        let mut b = TreeBuilder::new("file");
        b.text("\n\n")
            .leaf("a-stmt", "X=1")
            .text("\n\n  \n\t")
            .leaf("a-stmt", "Y=2")
            .text("\n");
        let mut tree = b.build();
        assert_eq!(remove_empty_lines(&mut tree), 2);
        assert_eq!(tree.to_source(), "X=1\n  Y=2\n");
    }
}
