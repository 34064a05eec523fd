/// Node kinds for the Fortran concrete syntax tree
///
/// The upstream parser tags every node with a grammar category string
/// (fxtran naming: `if-then-stmt`, `do-construct`, `cnt`, `C`, ...). The tag
/// is classified once into a closed [`NodeKind`] so the passes can match
/// exhaustively instead of comparing strings.
use std::fmt;

/// Program units: opened by `<unit>-stmt`, closed by `end-<unit>-stmt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Subroutine,
    Program,
    Module,
    Function,
    Submodule,
    /// Separate module procedure (`MODULE PROCEDURE`)
    Procedure,
    Interface,
}

impl Unit {
    const ALL: [Unit; 7] = [
        Unit::Subroutine,
        Unit::Program,
        Unit::Module,
        Unit::Function,
        Unit::Submodule,
        Unit::Procedure,
        Unit::Interface,
    ];

    fn keyword(self) -> &'static str {
        match self {
            Unit::Subroutine => "subroutine",
            Unit::Program => "program",
            Unit::Module => "module",
            Unit::Function => "function",
            Unit::Submodule => "submodule",
            Unit::Procedure => "procedure",
            Unit::Interface => "interface",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.keyword() == word)
    }
}

/// Families of branch blocks (`<family>-block` nodes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFamily {
    If,
    Where,
    SelectCase,
}

/// Named constructs (`<name>-construct` nodes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    Do,
    If,
    Where,
    SelectCase,
    SelectType,
    SelectRank,
    Forall,
    Associate,
    Block,
    Critical,
    ChangeTeam,
    DerivedType,
    Enum,
    Interface,
    /// Any other `-construct` tag: still a container, but without a known opener/closer
    Other,
}

impl Construct {
    fn from_name(name: &str) -> Self {
        match name {
            "do" => Construct::Do,
            "if" => Construct::If,
            "where" => Construct::Where,
            "selectcase" => Construct::SelectCase,
            "selecttype" => Construct::SelectType,
            "selectrank" => Construct::SelectRank,
            "forall" => Construct::Forall,
            "associate" => Construct::Associate,
            "block" => Construct::Block,
            "critical" => Construct::Critical,
            "change-team" => Construct::ChangeTeam,
            "T" => Construct::DerivedType,
            "enum" => Construct::Enum,
            "interface" => Construct::Interface,
            _ => Construct::Other,
        }
    }

    /// Construct whose body is opened by the statement `<name>-stmt`
    fn from_opener(stmt: &str) -> Option<Self> {
        match stmt {
            "do" => Some(Construct::Do),
            "forall-construct" => Some(Construct::Forall),
            "associate" => Some(Construct::Associate),
            "block" => Some(Construct::Block),
            "critical" => Some(Construct::Critical),
            "change-team" => Some(Construct::ChangeTeam),
            "T" => Some(Construct::DerivedType),
            "enum" | "enum-def" => Some(Construct::Enum),
            "select-T" => Some(Construct::SelectType),
            "select-rank" => Some(Construct::SelectRank),
            _ => None,
        }
    }

    /// Construct closed by the statement `end-<name>-stmt`
    fn from_closer(stmt: &str) -> Option<Self> {
        match stmt {
            "do" => Some(Construct::Do),
            "forall" => Some(Construct::Forall),
            "associate" => Some(Construct::Associate),
            "block" => Some(Construct::Block),
            "critical" => Some(Construct::Critical),
            "change-team" => Some(Construct::ChangeTeam),
            "T" => Some(Construct::DerivedType),
            "enum" => Some(Construct::Enum),
            "select-T" => Some(Construct::SelectType),
            "select-rank" => Some(Construct::SelectRank),
            _ => None,
        }
    }
}

/// Closed classification of a CST node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Structure
    File,
    ProgramUnit,
    UnitStmt(Unit),
    EndUnitStmt(Unit),
    Block(BlockFamily),
    Construct(Construct),
    ConstructStmt(Construct),
    EndConstructStmt(Construct),

    // Branch statements
    IfThenStmt,
    ElseIfStmt,
    ElseStmt,
    EndIfStmt,
    WhereConstructStmt,
    ElseWhereStmt,
    EndWhereStmt,
    SelectCaseStmt,
    CaseStmt,
    EndSelectCaseStmt,

    // One-line conditionals and their parts
    IfStmt,
    WhereStmt,
    ForallStmt,
    ActionStmt,
    Condition,
    Mask,
    ForallTriplets,

    // Other statements the passes look at
    CycleStmt,
    ContainsStmt,
    AssignStmt,
    PointerAssignStmt,
    CallStmt,
    UseStmt,
    DeclStmt,
    PrintStmt,
    WriteStmt,
    NamelistStmt,
    ImplicitNoneStmt,
    EnumeratorStmt,
    BlockDataStmt,
    EndBlockDataStmt,
    EndFileStmt,
    GotoStmt,
    SaveStmt,
    OtherStmt,

    // Trivia-like leaves
    Comment,
    Directive,
    Continuation,
    Separator,

    // Expressions, names and punctuation holders
    Affectation,
    OpExpr,
    Op,
    OpSpelling,
    Name,
    NamePart,
    TypeName,
    AttributeName,
    ModuleName,
    Attribute,
    TypeSpec,
    IntrinsicTypeSpec,
    IntentSpec,
    LowerBound,
    UpperBound,
    DoVar,
    Var,
    ArgName,
    EnumeratorName,
    NamedConstant,
    AssociateName,
    LiteralExpr,
    Literal,
    StringExpr,
    StringLit,
    NamedExpr,
    RefList,
    ComponentRef,
    ComponentName,

    Other,
}

impl NodeKind {
    /// Classify an upstream tag
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        if let Some(kind) = Self::from_exact_tag(tag) {
            return kind;
        }
        if let Some(name) = tag.strip_suffix("-construct") {
            return NodeKind::Construct(Construct::from_name(name));
        }
        if let Some(stmt) = tag.strip_suffix("-stmt") {
            if let Some(unit) = Unit::from_keyword(stmt) {
                return NodeKind::UnitStmt(unit);
            }
            if let Some(closed) = stmt.strip_prefix("end-") {
                if let Some(unit) = Unit::from_keyword(closed) {
                    return NodeKind::EndUnitStmt(unit);
                }
                if let Some(construct) = Construct::from_closer(closed) {
                    return NodeKind::EndConstructStmt(construct);
                }
            }
            if let Some(construct) = Construct::from_opener(stmt) {
                return NodeKind::ConstructStmt(construct);
            }
            return NodeKind::OtherStmt;
        }
        NodeKind::Other
    }

    fn from_exact_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "file" => NodeKind::File,
            "program-unit" => NodeKind::ProgramUnit,
            "if-block" => NodeKind::Block(BlockFamily::If),
            "where-block" => NodeKind::Block(BlockFamily::Where),
            "selectcase-block" => NodeKind::Block(BlockFamily::SelectCase),
            "if-then-stmt" => NodeKind::IfThenStmt,
            "else-if-stmt" => NodeKind::ElseIfStmt,
            "else-stmt" => NodeKind::ElseStmt,
            "end-if-stmt" => NodeKind::EndIfStmt,
            "where-construct-stmt" => NodeKind::WhereConstructStmt,
            "else-where-stmt" => NodeKind::ElseWhereStmt,
            "end-where-stmt" => NodeKind::EndWhereStmt,
            "select-case-stmt" => NodeKind::SelectCaseStmt,
            "case-stmt" => NodeKind::CaseStmt,
            "end-select-case-stmt" => NodeKind::EndSelectCaseStmt,
            "if-stmt" => NodeKind::IfStmt,
            "where-stmt" => NodeKind::WhereStmt,
            "forall-stmt" => NodeKind::ForallStmt,
            "action-stmt" => NodeKind::ActionStmt,
            "condition-E" => NodeKind::Condition,
            "mask-E" => NodeKind::Mask,
            "forall-triplet-spec-LT" => NodeKind::ForallTriplets,
            "cycle-stmt" => NodeKind::CycleStmt,
            "contains-stmt" => NodeKind::ContainsStmt,
            "a-stmt" => NodeKind::AssignStmt,
            "pointer-a-stmt" => NodeKind::PointerAssignStmt,
            "call-stmt" => NodeKind::CallStmt,
            "use-stmt" => NodeKind::UseStmt,
            "T-decl-stmt" => NodeKind::DeclStmt,
            "print-stmt" => NodeKind::PrintStmt,
            "write-stmt" => NodeKind::WriteStmt,
            "namelist-stmt" => NodeKind::NamelistStmt,
            "implicit-none-stmt" => NodeKind::ImplicitNoneStmt,
            "enumerator-stmt" => NodeKind::EnumeratorStmt,
            "block-data-stmt" => NodeKind::BlockDataStmt,
            "end-block-data-stmt" => NodeKind::EndBlockDataStmt,
            "end-file-stmt" => NodeKind::EndFileStmt,
            "goto-stmt" => NodeKind::GotoStmt,
            "save-stmt" => NodeKind::SaveStmt,
            "C" => NodeKind::Comment,
            "cpp" => NodeKind::Directive,
            "cnt" => NodeKind::Continuation,
            "smc" => NodeKind::Separator,
            "a" => NodeKind::Affectation,
            "op-E" => NodeKind::OpExpr,
            "op" => NodeKind::Op,
            "o" => NodeKind::OpSpelling,
            "N" => NodeKind::Name,
            "n" => NodeKind::NamePart,
            "T-N" => NodeKind::TypeName,
            "attribute-N" => NodeKind::AttributeName,
            "module-N" => NodeKind::ModuleName,
            "attribute" => NodeKind::Attribute,
            "_T-spec_" => NodeKind::TypeSpec,
            "intrinsic-T-spec" => NodeKind::IntrinsicTypeSpec,
            "intent-spec" => NodeKind::IntentSpec,
            "lower-bound" => NodeKind::LowerBound,
            "upper-bound" => NodeKind::UpperBound,
            "do-V" => NodeKind::DoVar,
            "V" => NodeKind::Var,
            "arg-N" => NodeKind::ArgName,
            "EN-N" => NodeKind::EnumeratorName,
            "named-constant" => NodeKind::NamedConstant,
            "associate-N" => NodeKind::AssociateName,
            "literal-E" => NodeKind::LiteralExpr,
            "l" => NodeKind::Literal,
            "string-E" => NodeKind::StringExpr,
            "S" => NodeKind::StringLit,
            "named-E" => NodeKind::NamedExpr,
            "R-LT" => NodeKind::RefList,
            "component-R" => NodeKind::ComponentRef,
            "ct" => NodeKind::ComponentName,
            _ => return None,
        };
        Some(kind)
    }

    /// Statement nodes (every `-stmt` tag)
    #[must_use]
    pub fn is_stmt(self) -> bool {
        match self {
            NodeKind::UnitStmt(_)
            | NodeKind::EndUnitStmt(_)
            | NodeKind::ConstructStmt(_)
            | NodeKind::EndConstructStmt(_)
            | NodeKind::IfThenStmt
            | NodeKind::ElseIfStmt
            | NodeKind::ElseStmt
            | NodeKind::EndIfStmt
            | NodeKind::WhereConstructStmt
            | NodeKind::ElseWhereStmt
            | NodeKind::EndWhereStmt
            | NodeKind::SelectCaseStmt
            | NodeKind::CaseStmt
            | NodeKind::EndSelectCaseStmt
            | NodeKind::IfStmt
            | NodeKind::WhereStmt
            | NodeKind::ForallStmt
            | NodeKind::ActionStmt
            | NodeKind::CycleStmt
            | NodeKind::ContainsStmt
            | NodeKind::AssignStmt
            | NodeKind::PointerAssignStmt
            | NodeKind::CallStmt
            | NodeKind::UseStmt
            | NodeKind::DeclStmt
            | NodeKind::PrintStmt
            | NodeKind::WriteStmt
            | NodeKind::NamelistStmt
            | NodeKind::ImplicitNoneStmt
            | NodeKind::EnumeratorStmt
            | NodeKind::BlockDataStmt
            | NodeKind::EndBlockDataStmt
            | NodeKind::EndFileStmt
            | NodeKind::GotoStmt
            | NodeKind::SaveStmt
            | NodeKind::OtherStmt => true,
            NodeKind::File
            | NodeKind::ProgramUnit
            | NodeKind::Block(_)
            | NodeKind::Construct(_)
            | NodeKind::Condition
            | NodeKind::Mask
            | NodeKind::ForallTriplets
            | NodeKind::Comment
            | NodeKind::Directive
            | NodeKind::Continuation
            | NodeKind::Separator
            | NodeKind::Affectation
            | NodeKind::OpExpr
            | NodeKind::Op
            | NodeKind::OpSpelling
            | NodeKind::Name
            | NodeKind::NamePart
            | NodeKind::TypeName
            | NodeKind::AttributeName
            | NodeKind::ModuleName
            | NodeKind::Attribute
            | NodeKind::TypeSpec
            | NodeKind::IntrinsicTypeSpec
            | NodeKind::IntentSpec
            | NodeKind::LowerBound
            | NodeKind::UpperBound
            | NodeKind::DoVar
            | NodeKind::Var
            | NodeKind::ArgName
            | NodeKind::EnumeratorName
            | NodeKind::NamedConstant
            | NodeKind::AssociateName
            | NodeKind::LiteralExpr
            | NodeKind::Literal
            | NodeKind::StringExpr
            | NodeKind::StringLit
            | NodeKind::NamedExpr
            | NodeKind::RefList
            | NodeKind::ComponentRef
            | NodeKind::ComponentName
            | NodeKind::Other => false,
        }
    }

    /// Nodes whose children are whole statements (re-leveled by the indenter)
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::File | NodeKind::ProgramUnit | NodeKind::Block(_) | NodeKind::Construct(_)
        )
    }

    /// ELSE / ELSE IF / ELSEWHERE: interior delimiters of a branch construct
    #[must_use]
    pub fn is_inter_branch(self) -> bool {
        matches!(
            self,
            NodeKind::ElseStmt | NodeKind::ElseIfStmt | NodeKind::ElseWhereStmt
        )
    }

    /// Headers after which a branch body starts
    #[must_use]
    pub fn opens_branch(self) -> bool {
        matches!(self, NodeKind::IfThenStmt | NodeKind::WhereConstructStmt) || self.is_inter_branch()
    }

    /// Closers of branch constructs
    #[must_use]
    pub fn closes_branch(self) -> bool {
        matches!(self, NodeKind::EndIfStmt | NodeKind::EndWhereStmt)
    }

    /// Whether this statement opens the body of `construct`
    #[must_use]
    pub fn opens(self, construct: Construct) -> bool {
        self == NodeKind::ConstructStmt(construct) && construct != Construct::Other
    }

    /// Whether this statement closes `construct`
    #[must_use]
    pub fn closes(self, construct: Construct) -> bool {
        self == NodeKind::EndConstructStmt(construct) && construct != Construct::Other
    }

    /// Comments and preprocessor lines: the nodes that may sit between a
    /// continuation marker and the rest of its statement
    #[must_use]
    pub fn is_comment_like(self) -> bool {
        matches!(self, NodeKind::Comment | NodeKind::Directive)
    }

    /// Nodes whose text is not Fortran code (left alone by case folding and spacing)
    #[must_use]
    pub fn is_non_code(self) -> bool {
        matches!(
            self,
            NodeKind::Comment | NodeKind::Directive | NodeKind::StringLit
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::UnitStmt(unit) => write!(f, "{}-stmt", unit.keyword()),
            NodeKind::EndUnitStmt(unit) => write!(f, "end-{}-stmt", unit.keyword()),
            NodeKind::Block(family) => write!(f, "{family:?}-block"),
            NodeKind::Construct(c) => write!(f, "{c:?}-construct"),
            NodeKind::ConstructStmt(c) => write!(f, "{c:?}-stmt"),
            NodeKind::EndConstructStmt(c) => write!(f, "end-{c:?}-stmt"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_units() {
        assert_eq!(
            NodeKind::from_tag("subroutine-stmt"),
            NodeKind::UnitStmt(Unit::Subroutine)
        );
        assert_eq!(
            NodeKind::from_tag("end-module-stmt"),
            NodeKind::EndUnitStmt(Unit::Module)
        );
        assert_eq!(
            NodeKind::from_tag("procedure-stmt"),
            NodeKind::UnitStmt(Unit::Procedure)
        );
    }

    #[test]
    fn test_constructs() {
        assert_eq!(
            NodeKind::from_tag("do-construct"),
            NodeKind::Construct(Construct::Do)
        );
        assert_eq!(
            NodeKind::from_tag("selectcase-construct"),
            NodeKind::Construct(Construct::SelectCase)
        );
        assert_eq!(
            NodeKind::from_tag("mystery-construct"),
            NodeKind::Construct(Construct::Other)
        );
        assert_eq!(
            NodeKind::from_tag("do-stmt"),
            NodeKind::ConstructStmt(Construct::Do)
        );
        assert_eq!(
            NodeKind::from_tag("end-do-stmt"),
            NodeKind::EndConstructStmt(Construct::Do)
        );
        assert_eq!(
            NodeKind::from_tag("end-T-stmt"),
            NodeKind::EndConstructStmt(Construct::DerivedType)
        );
    }

    #[test]
    fn test_exact_tags_win_over_suffixes() {
        assert_eq!(NodeKind::from_tag("if-stmt"), NodeKind::IfStmt);
        assert_eq!(NodeKind::from_tag("end-if-stmt"), NodeKind::EndIfStmt);
        assert_eq!(
            NodeKind::from_tag("end-select-case-stmt"),
            NodeKind::EndSelectCaseStmt
        );
        assert_eq!(NodeKind::from_tag("cnt"), NodeKind::Continuation);
        assert_eq!(NodeKind::from_tag("C"), NodeKind::Comment);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(NodeKind::from_tag("return-stmt"), NodeKind::OtherStmt);
        assert_eq!(NodeKind::from_tag("E-1"), NodeKind::Other);
    }

    #[test]
    fn test_predicates() {
        assert!(NodeKind::OtherStmt.is_stmt());
        assert!(NodeKind::EndUnitStmt(Unit::Function).is_stmt());
        assert!(!NodeKind::Continuation.is_stmt());
        assert!(NodeKind::Construct(Construct::Other).is_container());
        assert!(NodeKind::ElseStmt.opens_branch());
        assert!(!NodeKind::ElseStmt.closes_branch());
        assert!(NodeKind::ConstructStmt(Construct::Do).opens(Construct::Do));
        assert!(!NodeKind::ConstructStmt(Construct::Do).opens(Construct::Block));
        assert!(NodeKind::StringLit.is_non_code());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", NodeKind::UnitStmt(Unit::Subroutine)),
            "subroutine-stmt"
        );
        assert_eq!(
            format!("{}", NodeKind::EndUnitStmt(Unit::Program)),
            "end-program-stmt"
        );
    }
}
