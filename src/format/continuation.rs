/// Continuation marker (`&`) management
///
/// Two passes over a statement-bearing subtree:
/// - a reverse pass that inserts missing line-begin markers or removes
///   markers, depending on the options
/// - a forward pass that aligns continued lines on a column computed from
///   the first line of their statement (see [`crate::format::aligner`])
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;
use crate::format::aligner::{alignment_column, AnchorClass, DEFAULT_COLUMN};
use crate::format::patterns::{spaces, NEWLINE_INDENT_RE};
use crate::tree::{NodeId, NodeKind, Tree};

/// How continuation markers are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContinuationOptions {
    /// Align the beginning of continued lines
    pub align: bool,
    /// Remove every marker, joining continued lines
    pub remove_all: bool,
    /// Add a missing marker at the beginning of continued lines
    pub add_begin: bool,
    /// Remove markers at the beginning of continued lines
    pub remove_begin: bool,
}

impl Default for ContinuationOptions {
    fn default() -> Self {
        Self {
            align: true,
            remove_all: false,
            add_begin: true,
            remove_begin: false,
        }
    }
}

impl ContinuationOptions {
    /// Reject contradictory mode combinations
    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.align && self.remove_all {
            return Err(NormalizeError::ConflictingModes {
                first: "align",
                second: "remove_all",
            });
        }
        if self.add_begin && (self.remove_all || self.remove_begin) {
            let second = if self.remove_all {
                "remove_all"
            } else {
                "remove_begin"
            };
            return Err(NormalizeError::ConflictingModes {
                first: "add_begin",
                second,
            });
        }
        Ok(())
    }

    fn removes(&self, is_line_end: bool) -> bool {
        self.remove_all || (self.remove_begin && !is_line_end)
    }
}

/// What a continuation update did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuationReport {
    pub inserted: usize,
    pub removed: usize,
    pub aligned: usize,
}

struct Manager<'a> {
    tree: &'a mut Tree,
    options: ContinuationOptions,
    report: ContinuationReport,
}

/// Update continuation markers below `node` (the whole tree when `None`)
///
/// Options are validated before anything is touched.
#[tracing::instrument(level = "debug", skip_all)]
pub fn update_continuation(
    tree: &mut Tree,
    node: Option<NodeId>,
    options: ContinuationOptions,
) -> Result<ContinuationReport, NormalizeError> {
    options.validate()?;
    let node = node.unwrap_or(tree.root());
    let mut manager = Manager {
        tree,
        options,
        report: ContinuationReport::default(),
    };
    manager.reverse(node);
    if options.align {
        let mut line = String::new();
        let mut column = None;
        manager.forward(node, &mut line, &mut column);
    }
    tracing::debug!(
        inserted = manager.report.inserted,
        removed = manager.report.removed,
        aligned = manager.report.aligned,
        "continuation markers updated"
    );
    Ok(manager.report)
}

/// Byte offset of the first character that is not a blank or a newline
fn first_code_offset(text: &str) -> usize {
    text.find(|c| !matches!(c, ' ' | '\n' | '\t'))
        .unwrap_or(text.len())
}

impl Manager<'_> {
    fn new_marker(&mut self, tail: String) -> NodeId {
        let marker = self.tree.new_leaf("cnt", "&");
        self.tree.set_tail(marker, tail);
        self.report.inserted += 1;
        marker
    }

    /// Children are visited last to first so edits never shift unvisited indices
    fn reverse(&mut self, elem: NodeId) {
        let count = self.tree.children(elem).len();
        for index in (0..count).rev() {
            let children = self.tree.children(elem).to_vec();
            let Some(&child) = children.get(index) else {
                continue;
            };

            if self.tree.kind(child) == NodeKind::Continuation {
                let comments_after: Vec<NodeId> = children[index + 1..]
                    .iter()
                    .copied()
                    .take_while(|&c| self.tree.kind(c).is_comment_like())
                    .collect();
                let next = children.get(index + 1 + comments_after.len()).copied();
                let is_line_end =
                    self.tree.tail(child).contains('\n') || !comments_after.is_empty();

                if is_line_end && self.options.add_begin {
                    self.insert_begin_marker(elem, index, child, &comments_after, next);
                }
                if self.options.removes(is_line_end) {
                    self.remove_marker(elem, index, child, &comments_after);
                }
            }

            if self.tree.has_children(child) {
                self.reverse(child);
            }
        }
    }

    fn insert_begin_marker(
        &mut self,
        elem: NodeId,
        index: usize,
        marker: NodeId,
        comments_after: &[NodeId],
        next: Option<NodeId>,
    ) {
        let tail = self.tree.tail(marker).to_string();
        let offset = first_code_offset(&tail);
        if offset < tail.len() {
            // Code (often a closing parenthesis) sits in the tail itself
            let new = self.new_marker(format!(" {}", &tail[offset..]));
            self.tree.set_tail(marker, &tail[..offset]);
            self.tree.insert_child(elem, index + 1, new);
            tracing::trace!(?marker, "begin marker split out of tail");
        } else if next.is_some_and(|n| self.tree.kind(n) != NodeKind::Continuation) {
            let new_tail = match comments_after.last() {
                Some(&last) => {
                    let comment_tail = self.tree.tail(last).to_string();
                    let offset = first_code_offset(&comment_tail);
                    self.tree.set_tail(last, &comment_tail[..offset]);
                    format!(" {}", &comment_tail[offset..])
                }
                None => " ".to_string(),
            };
            let new = self.new_marker(new_tail);
            self.tree
                .insert_child(elem, index + 1 + comments_after.len(), new);
            tracing::trace!(?marker, "begin marker inserted");
        }
    }

    /// Comments after the marker go with it; a preprocessor line keeps both
    fn remove_marker(
        &mut self,
        elem: NodeId,
        index: usize,
        marker: NodeId,
        comments_after: &[NodeId],
    ) {
        let mut keeps_directive = false;
        for &comment in comments_after.iter().rev() {
            if self.tree.kind(comment) == NodeKind::Directive {
                keeps_directive = true;
            } else {
                self.tree.detach(elem, comment);
            }
        }
        if keeps_directive {
            return;
        }
        self.tree.detach(elem, marker);
        let joined = format!("{} ", self.tree.tail(marker).trim());
        self.tree.append_trivia_before(elem, index, &joined);
        self.report.removed += 1;
        tracing::trace!(?marker, "marker removed");
    }

    /// Nearest statement enclosing (or being) `node`
    fn enclosing_statement(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.tree.kind(id).is_stmt() {
                return Some(id);
            }
            current = self.tree.parent(id);
        }
        None
    }

    /// `line` holds the text of the current physical line; `column` is set
    /// while inside a continued statement
    fn forward(&mut self, elem: NodeId, line: &mut String, column: &mut Option<usize>) {
        let children = self.tree.children(elem).to_vec();
        let mut after_comment = false;

        for (index, &child) in children.iter().enumerate() {
            let kind = self.tree.kind(child);
            let next_kind = children.get(index + 1).map(|&n| self.tree.kind(n));

            let is_end_marker = kind == NodeKind::Continuation
                && (self.tree.tail(child).contains('\n') || next_kind == Some(NodeKind::Comment));
            after_comment =
                after_comment || (is_end_marker && next_kind == Some(NodeKind::Comment));

            let realign = is_end_marker
                || (after_comment && kind == NodeKind::Comment)
                || (column.is_some() && kind == NodeKind::Directive);
            if realign {
                if is_end_marker && column.is_none() {
                    let class = self
                        .enclosing_statement(elem)
                        .map_or(AnchorClass::Generic, |s| {
                            AnchorClass::for_statement(self.tree.kind(s))
                        });
                    let has_begin_marker =
                        next_kind.map_or(true, |k| k == NodeKind::Continuation);
                    *column = Some(alignment_column(class, line, has_begin_marker));
                }
                if next_kind != Some(NodeKind::Directive) {
                    self.align_tail(child, column.unwrap_or(DEFAULT_COLUMN));
                }
            }

            if !matches!(kind, NodeKind::Comment | NodeKind::Continuation) {
                line.push_str(self.tree.text(child));
                after_comment = false;
            }

            if self.tree.has_children(child) {
                self.forward(child, line, column);
            }

            line.push_str(self.tree.tail(child));
            if let Some(pos) = line.rfind('\n') {
                *line = line[pos + 1..].to_string();
                if !matches!(
                    kind,
                    NodeKind::Continuation | NodeKind::Comment | NodeKind::Directive
                ) {
                    *column = None;
                }
            }
        }
    }

    fn align_tail(&mut self, node: NodeId, column: usize) {
        let tail = self.tree.tail(node);
        if !tail.contains('\n') {
            return;
        }
        let aligned = NEWLINE_INDENT_RE
            .replace_all(tail, format!("\n{}", spaces(column)).as_str())
            .into_owned();
        if aligned != self.tree.tail(node) {
            self.tree.set_tail(node, aligned);
            self.report.aligned += 1;
        }
    }
}
