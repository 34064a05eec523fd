/// Construct-aware re-indentation of a CST
///
/// Indentation lives in tails: the spaces after a newline in a node's tail
/// are the indentation of the next line. The indenter walks containers
/// recursively, tracking the current level, and rewrites every newline run
/// in each tail to `\n` followed by the level for the line that follows.
use serde::{Deserialize, Serialize};

use crate::format::patterns::{spaces, NEWLINE_INDENT_RE};
use crate::tree::{Construct, NodeId, NodeKind, Tree};

/// Parameters for indentation processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndentParams {
    /// Indent added inside a program unit (subroutine, module, ...)
    pub program_unit: usize,
    /// Indent added inside branches and constructs (IF, DO, ...)
    pub branch: usize,
    /// Comment prefixes marking directive lines that keep their indentation
    pub excluded_directives: Vec<String>,
}

impl Default for IndentParams {
    fn default() -> Self {
        Self {
            program_unit: 0,
            branch: 2,
            excluded_directives: vec!["!$OMP".to_string()],
        }
    }
}

/// `X` for an `X-construct` tag
fn construct_name(tag: &str) -> Option<&str> {
    tag.strip_suffix("-construct")
}

struct Indenter<'a> {
    tree: &'a mut Tree,
    params: &'a IndentParams,
    /// Tail rewrites that changed text
    rewritten: usize,
}

/// Re-indent the whole tree from level 0
pub fn indent(tree: &mut Tree, params: &IndentParams) -> usize {
    let root = tree.root();
    indent_subtree(tree, root, 0, params)
}

/// Re-indent the children of `node`, starting at `base_level`
///
/// Returns the number of tails whose text changed. Malformed trees
/// (unbalanced openers and closers) get best-effort indentation.
#[tracing::instrument(level = "debug", skip_all, fields(base_level))]
pub fn indent_subtree(
    tree: &mut Tree,
    node: NodeId,
    base_level: usize,
    params: &IndentParams,
) -> usize {
    let mut indenter = Indenter {
        tree,
        params,
        rewritten: 0,
    };
    indenter.recur(node, base_level, None);
    tracing::debug!(rewritten = indenter.rewritten, "indentation updated");
    indenter.rewritten
}

impl Indenter<'_> {
    /// Whether the line starting after a tail must keep its indentation
    fn is_excluded(&self, next: Option<NodeId>) -> bool {
        let Some(next) = next else {
            return false;
        };
        match self.tree.kind(next) {
            NodeKind::Directive => true,
            NodeKind::Comment => {
                let text = self.tree.text(next);
                self.params
                    .excluded_directives
                    .iter()
                    .any(|d| text.starts_with(d.as_str()))
            }
            _ => false,
        }
    }

    /// Set the indentation of the line that follows `node`
    fn set_level(&mut self, node: NodeId, level: usize, next: Option<NodeId>) {
        let tail = self.tree.tail(node);
        if tail.is_empty() {
            return;
        }
        let mut updated = tail.replace('\t', "  ");
        if !self.is_excluded(next) {
            updated = NEWLINE_INDENT_RE
                .replace_all(&updated, format!("\n{}", spaces(level)).as_str())
                .into_owned();
        }
        if updated != self.tree.tail(node) {
            self.rewritten += 1;
            self.tree.set_tail(node, updated);
        }
    }

    /// Whether `child` opens the body of the construct node `construct`
    ///
    /// Constructs outside the known set pair by tag: `X-stmt` opens an
    /// `X-construct` and `end-X-stmt` closes it.
    fn opens_construct(&self, construct: NodeId, child: NodeId) -> bool {
        match self.tree.kind(construct) {
            NodeKind::Construct(Construct::Other) => construct_name(self.tree.tag(construct))
                .is_some_and(|name| self.tree.tag(child) == format!("{name}-stmt")),
            NodeKind::Construct(c) => self.tree.kind(child).opens(c),
            _ => false,
        }
    }

    fn closes_construct(&self, construct: NodeId, child: NodeId) -> bool {
        match self.tree.kind(construct) {
            NodeKind::Construct(Construct::Other) => construct_name(self.tree.tag(construct))
                .is_some_and(|name| self.tree.tag(child) == format!("end-{name}-stmt")),
            NodeKind::Construct(c) => self.tree.kind(child).closes(c),
            _ => false,
        }
    }

    fn recur(&mut self, elem: NodeId, level: usize, in_construct: Option<NodeId>) {
        let children = self.tree.children(elem).to_vec();
        let in_select = self.tree.kind(elem) == NodeKind::Construct(Construct::SelectCase);
        let branch = self.params.branch;

        let mut current = level;
        let mut previous: Option<NodeId> = None;
        let mut first_arm = true;

        for (i, &child) in children.iter().enumerate() {
            let next = children.get(i + 1).copied();
            let kind = self.tree.kind(child);

            // Opening lines keep the outer level; only what follows is shifted
            if matches!(kind, NodeKind::UnitStmt(_)) {
                current += self.params.program_unit;
            } else if kind.opens_branch()
                || in_construct.is_some_and(|c| self.opens_construct(c, child))
            {
                current += branch;
            }

            self.set_level(child, current, next);

            if in_select {
                // Each CASE arm is a block nested in the construct: the CASE
                // line sits one branch in, its statements two.
                if first_arm {
                    first_arm = false;
                } else if let Some(last) = previous.and_then(|p| self.tree.last_child(p)) {
                    self.set_level(last, level + branch, Some(child));
                }
                self.recur(child, level + 2 * branch, None);

                let arm = self.tree.children(child).to_vec();
                if let [.., before_end, end] = arm[..] {
                    if self.tree.kind(end) == NodeKind::EndSelectCaseStmt {
                        self.set_level(before_end, level, Some(end));
                    }
                }
            } else if kind.is_container() {
                let opens_with_else = self
                    .tree
                    .first_child(child)
                    .is_some_and(|f| self.tree.kind(f).is_inter_branch());
                if opens_with_else {
                    if let Some(last) = previous.and_then(|p| self.tree.last_child(p)) {
                        self.set_level(last, level, Some(child));
                    }
                }
                let construct = matches!(kind, NodeKind::Construct(_)).then_some(child);
                self.recur(child, current, construct);
            }

            let closes = matches!(kind, NodeKind::EndUnitStmt(_))
                || kind.closes_branch()
                || in_construct.is_some_and(|c| self.closes_construct(c, child));
            if closes {
                if let Some(prev) = previous {
                    self.set_level(prev, level, Some(child));
                }
            }
            previous = Some(child);
        }
    }
}
