/// Keyword tables for the spacing pass
///
/// - Adjacent keywords: pairs (or triples) of keywords whose separating
///   blanks are optional in free form (`END DO` / `ENDDO`), plus
///   `END SELECT`, `IMPLICIT NONE` and `MODULE PROCEDURE`
/// - After keywords: the blank count following a statement keyword
use std::sync::LazyLock;

use regex::Regex;

use crate::format::patterns::{build_re, spaces};
use crate::tree::{Construct, NodeKind, Unit};

/// Which nodes an adjacent keyword entry rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordTarget {
    /// Every node of this kind
    Kind(NodeKind),
    /// Type names inside an intrinsic type spec (`DOUBLE PRECISION`)
    IntrinsicTypeName,
}

/// One entry of the adjacent keyword table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacentKeyword {
    /// Configuration key: the keywords joined by `_`
    pub key: &'static str,
    /// Blanks written between the keywords by default
    pub default: usize,
    /// Smallest legal value
    pub minimum: usize,
    pub target: KeywordTarget,
}

const fn adjacent(key: &'static str, default: usize, kind: NodeKind) -> AdjacentKeyword {
    AdjacentKeyword {
        key,
        default,
        minimum: 0,
        target: KeywordTarget::Kind(kind),
    }
}

const fn required(key: &'static str, kind: NodeKind) -> AdjacentKeyword {
    AdjacentKeyword {
        key,
        default: 1,
        minimum: 1,
        target: KeywordTarget::Kind(kind),
    }
}

pub static ADJACENT_KEYWORDS: [AdjacentKeyword; 31] = [
    adjacent("block_data", 1, NodeKind::BlockDataStmt),
    AdjacentKeyword {
        key: "double_precision",
        default: 1,
        minimum: 0,
        target: KeywordTarget::IntrinsicTypeName,
    },
    adjacent("else_if", 1, NodeKind::ElseIfStmt),
    adjacent("else_where", 0, NodeKind::ElseWhereStmt),
    adjacent("end_associate", 1, NodeKind::EndConstructStmt(Construct::Associate)),
    adjacent("end_block", 1, NodeKind::EndConstructStmt(Construct::Block)),
    adjacent("end_block_data", 1, NodeKind::EndBlockDataStmt),
    adjacent("end_critical", 1, NodeKind::EndConstructStmt(Construct::Critical)),
    adjacent("end_do", 1, NodeKind::EndConstructStmt(Construct::Do)),
    adjacent("end_enum", 1, NodeKind::EndConstructStmt(Construct::Enum)),
    adjacent("end_file", 1, NodeKind::EndFileStmt),
    adjacent("end_forall", 1, NodeKind::EndConstructStmt(Construct::Forall)),
    adjacent("end_function", 1, NodeKind::EndUnitStmt(Unit::Function)),
    adjacent("end_if", 1, NodeKind::EndIfStmt),
    adjacent("end_interface", 1, NodeKind::EndUnitStmt(Unit::Interface)),
    adjacent("end_module", 1, NodeKind::EndUnitStmt(Unit::Module)),
    adjacent("end_procedure", 1, NodeKind::EndUnitStmt(Unit::Procedure)),
    adjacent("end_program", 1, NodeKind::EndUnitStmt(Unit::Program)),
    // `end_selec` is END SELECT closing a SELECT CASE
    adjacent("end_selec", 1, NodeKind::EndSelectCaseStmt),
    adjacent("end_select", 1, NodeKind::EndConstructStmt(Construct::SelectType)),
    adjacent("end_submodule", 1, NodeKind::EndUnitStmt(Unit::Submodule)),
    adjacent("end_subroutine", 1, NodeKind::EndUnitStmt(Unit::Subroutine)),
    adjacent("end_team", 1, NodeKind::EndConstructStmt(Construct::ChangeTeam)),
    adjacent("end_type", 1, NodeKind::EndConstructStmt(Construct::DerivedType)),
    adjacent("end_where", 1, NodeKind::EndWhereStmt),
    adjacent("go_to", 0, NodeKind::GotoStmt),
    adjacent("in_out", 0, NodeKind::IntentSpec),
    adjacent("select_case", 1, NodeKind::SelectCaseStmt),
    adjacent("select_type", 1, NodeKind::ConstructStmt(Construct::SelectType)),
    required("implicit_none", NodeKind::ImplicitNoneStmt),
    required("module_procedure", NodeKind::UnitStmt(Unit::Procedure)),
];

/// Entry for a configuration key
#[must_use]
pub fn adjacent_keyword(key: &str) -> Option<&'static AdjacentKeyword> {
    ADJACENT_KEYWORDS.iter().find(|k| k.key == key)
}

/// `(end)[ ]*(do)` for `end_do`, compiled once per entry
static ADJACENT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ADJACENT_KEYWORDS
        .iter()
        .map(|k| {
            let pattern = k
                .key
                .split('_')
                .map(|word| format!("({word})"))
                .collect::<Vec<_>>()
                .join("[ ]*");
            build_re(&pattern)
        })
        .collect()
});

impl AdjacentKeyword {
    fn regex(&self) -> Option<&'static Regex> {
        let index = ADJACENT_KEYWORDS.iter().position(|k| k.key == self.key)?;
        ADJACENT_RES.get(index)
    }

    /// Rewrite the blanks between the keywords of this entry in `text`
    #[must_use]
    pub fn apply(&self, text: &str, count: usize) -> String {
        let Some(re) = self.regex() else {
            return text.to_string();
        };
        let words = self.key.split('_').count();
        let replacement = (1..=words)
            .map(|i| format!("${{{i}}}"))
            .collect::<Vec<_>>()
            .join(&spaces(count));
        re.replace_all(text, replacement.as_str()).into_owned()
    }
}

/// One entry of the after-keyword table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AfterKeyword {
    /// Configuration key: the keyword in lower case
    pub key: &'static str,
    pub default: usize,
    pub minimum: usize,
    pub kind: NodeKind,
}

pub static AFTER_KEYWORDS: [AfterKeyword; 6] = [
    AfterKeyword {
        key: "print",
        default: 0,
        minimum: 0,
        kind: NodeKind::PrintStmt,
    },
    AfterKeyword {
        key: "call",
        default: 1,
        minimum: 1,
        kind: NodeKind::CallStmt,
    },
    AfterKeyword {
        key: "use",
        default: 1,
        minimum: 1,
        kind: NodeKind::UseStmt,
    },
    AfterKeyword {
        key: "do",
        default: 1,
        minimum: 1,
        kind: NodeKind::ConstructStmt(Construct::Do),
    },
    AfterKeyword {
        key: "end-file",
        default: 1,
        minimum: 1,
        kind: NodeKind::EndFileStmt,
    },
    AfterKeyword {
        key: "save",
        default: 1,
        minimum: 0,
        kind: NodeKind::SaveStmt,
    },
];

/// Entry for a configuration key
#[must_use]
pub fn after_keyword(key: &str) -> Option<&'static AfterKeyword> {
    AFTER_KEYWORDS.iter().find(|k| k.key == key)
}

/// Entry applying to statements of `kind`
#[must_use]
pub fn after_keyword_for(kind: NodeKind) -> Option<&'static AfterKeyword> {
    AFTER_KEYWORDS.iter().find(|k| k.kind == kind)
}

/// `^([ ]*end[ ]*file)\b[ ]*` for `end-file`: the keyword and the blanks after it
static AFTER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    AFTER_KEYWORDS
        .iter()
        .map(|k| build_re(&format!(r"^([ ]*{})\b[ ]*", k.key.replace('-', "[ ]*"))))
        .collect()
});

impl AfterKeyword {
    /// Set the blanks directly following the keyword at the start of `text`
    ///
    /// Anything after those blanks (`WHILE (`, `CONCURRENT (`) is kept as is.
    #[must_use]
    pub fn apply(&self, text: &str, count: usize) -> String {
        let re = AFTER_KEYWORDS
            .iter()
            .position(|k| k.key == self.key)
            .and_then(|i| AFTER_RES.get(i));
        let Some(re) = re else {
            return text.to_string();
        };
        re.replace(text, format!("${{1}}{}", spaces(count)).as_str())
            .into_owned()
    }
}
