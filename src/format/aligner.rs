/// Anchor tables for continuation line alignment
///
/// When a statement is continued, the following lines are aligned on a
/// column found in the text of its first line. The column comes from the
/// first anchor pattern, in priority order, that matches that text:
/// 1. Assignment: after `=>`, `=` or `(`
/// 2. Calls, conditionals, declarations, USE, I/O: dedicated lists below
/// 3. Anything else: a generic delimiter list
///
/// The tables are plain data so they can be tested without a tree.
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::format::patterns::build_re;
use crate::tree::{Construct, NodeKind, Unit};

/// Column used when no anchor matches
pub const DEFAULT_COLUMN: usize = 4;

/// Statement families sharing an anchor list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorClass {
    Assignment,
    Call,
    If,
    Where,
    Forall,
    Namelist,
    Subroutine,
    Use,
    Declaration,
    Print,
    Write,
    ModuleProcedure,
    Generic,
}

impl AnchorClass {
    const ALL: [AnchorClass; 13] = [
        AnchorClass::Assignment,
        AnchorClass::Call,
        AnchorClass::If,
        AnchorClass::Where,
        AnchorClass::Forall,
        AnchorClass::Namelist,
        AnchorClass::Subroutine,
        AnchorClass::Use,
        AnchorClass::Declaration,
        AnchorClass::Print,
        AnchorClass::Write,
        AnchorClass::ModuleProcedure,
        AnchorClass::Generic,
    ];

    /// Anchor family of the statement enclosing a continuation
    #[must_use]
    pub fn for_statement(kind: NodeKind) -> Self {
        match kind {
            NodeKind::AssignStmt | NodeKind::PointerAssignStmt => AnchorClass::Assignment,
            NodeKind::CallStmt => AnchorClass::Call,
            NodeKind::IfStmt | NodeKind::ElseIfStmt | NodeKind::EndIfStmt => AnchorClass::If,
            NodeKind::WhereStmt | NodeKind::ElseWhereStmt | NodeKind::EndWhereStmt => {
                AnchorClass::Where
            }
            NodeKind::ForallStmt | NodeKind::EndConstructStmt(Construct::Forall) => {
                AnchorClass::Forall
            }
            NodeKind::NamelistStmt => AnchorClass::Namelist,
            NodeKind::UnitStmt(Unit::Subroutine) | NodeKind::EndUnitStmt(Unit::Subroutine) => {
                AnchorClass::Subroutine
            }
            NodeKind::UseStmt => AnchorClass::Use,
            NodeKind::DeclStmt => AnchorClass::Declaration,
            NodeKind::PrintStmt => AnchorClass::Print,
            NodeKind::WriteStmt => AnchorClass::Write,
            NodeKind::UnitStmt(Unit::Procedure) | NodeKind::EndUnitStmt(Unit::Procedure) => {
                AnchorClass::ModuleProcedure
            }
            _ => AnchorClass::Generic,
        }
    }

    /// Anchor patterns, highest priority first
    #[must_use]
    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            AnchorClass::Assignment => &["=>", "=", r"\("],
            AnchorClass::Call => &[r"\(", r"call[ ]+\w", "call ", "call"],
            AnchorClass::If => &[r"\(", r"\)", "if ", "if"],
            AnchorClass::Where => &[r"\(", r"\)", "where ", "where"],
            AnchorClass::Forall => &[r"\(", r"\)", "forall ", "forall"],
            AnchorClass::Namelist => &["/.*/", "/", "namelist"],
            AnchorClass::Subroutine => &[r"\(", r"subroutine[ ]+\w", "subroutine ", "subroutine"],
            AnchorClass::Use => &[":", r"use[ ]+\w", "use ", "use"],
            AnchorClass::Declaration => &["::", r"\w,", r"\w ", r"\w"],
            AnchorClass::Print => &["print"],
            AnchorClass::Write => &[r"\)", r"write[ ]*\(", "write[ ]*", "write"],
            AnchorClass::ModuleProcedure => &["module[ ]+procedure[ ]*", "module[ ]*", "module"],
            AnchorClass::Generic => &["::", ":", r"\(", "=>", "=", r"\[", ":", "/"],
        }
    }
}

static COMPILED: LazyLock<HashMap<AnchorClass, Vec<Regex>>> = LazyLock::new(|| {
    AnchorClass::ALL
        .into_iter()
        .map(|class| (class, class.patterns().iter().map(|p| build_re(p)).collect()))
        .collect()
});

/// Column on which the lines continuing `text` are aligned
///
/// `text` is the statement text accumulated on its first physical line.
/// With a leading `&` on the continued line, the column moves one left so
/// that the code after the marker lands on the anchor.
#[must_use]
pub fn alignment_column(class: AnchorClass, text: &str, has_begin_marker: bool) -> usize {
    let found = COMPILED
        .get(&class)
        .into_iter()
        .flatten()
        .find_map(|re| re.find(text));
    match found {
        Some(m) => {
            let column = text[..m.end()].chars().count();
            if has_begin_marker {
                column.saturating_sub(1)
            } else {
                column
            }
        }
        None => DEFAULT_COLUMN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_prefers_arrow() {
        assert_eq!(alignment_column(AnchorClass::Assignment, "P => F(", false), 4);
        assert_eq!(alignment_column(AnchorClass::Assignment, "X = Y + ", false), 3);
        assert_eq!(alignment_column(AnchorClass::Assignment, "X = Y + ", true), 2);
    }

    #[test]
    fn test_call_aligns_after_parenthesis() {
        assert_eq!(alignment_column(AnchorClass::Call, "CALL FOO(A, ", false), 9);
        assert_eq!(alignment_column(AnchorClass::Call, "CALL FOO ", false), 6);
    }

    #[test]
    fn test_declaration() {
        assert_eq!(
            alignment_column(AnchorClass::Declaration, "REAL :: X1, ", false),
            7
        );
        assert_eq!(alignment_column(AnchorClass::Declaration, "REAL X, ", false), 7);
    }

    #[test]
    fn test_generic_and_default() {
        assert_eq!(alignment_column(AnchorClass::Generic, "A[1, ", false), 2);
        assert_eq!(alignment_column(AnchorClass::Generic, "RETURN ", false), DEFAULT_COLUMN);
        assert_eq!(alignment_column(AnchorClass::Print, "", true), DEFAULT_COLUMN);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(alignment_column(AnchorClass::Use, "use mod, only", false), 5);
        assert_eq!(alignment_column(AnchorClass::Use, "USE MOD, ONLY: A, ", false), 14);
    }

    #[test]
    fn test_statement_classes() {
        assert_eq!(AnchorClass::for_statement(NodeKind::PointerAssignStmt), AnchorClass::Assignment);
        assert_eq!(AnchorClass::for_statement(NodeKind::ElseIfStmt), AnchorClass::If);
        assert_eq!(
            AnchorClass::for_statement(NodeKind::UnitStmt(Unit::Procedure)),
            AnchorClass::ModuleProcedure
        );
        assert_eq!(AnchorClass::for_statement(NodeKind::OtherStmt), AnchorClass::Generic);
    }

    #[test]
    fn test_every_table_compiles() {
        for class in AnchorClass::ALL {
            assert_eq!(COMPILED[&class].len(), class.patterns().len());
        }
    }
}
