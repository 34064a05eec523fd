/// Whitespace normalization on a CST
///
/// Rules are keyed to node kinds and applied in four ordered passes:
/// 1. punctuation, end of line and per-kind rules on every node
/// 2. operators, affectations and conditional keywords (these act on
///    children and depend on the output of pass 1)
/// 3. blanks around continuation markers
/// 4. adjacent keywords (`END DO` / `ENDDO`)
///
/// Every count can be set to "keep" to leave that spacing unchanged.
use std::collections::BTreeMap;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;
use crate::format::keywords::{
    adjacent_keyword, after_keyword, after_keyword_for, KeywordTarget, ADJACENT_KEYWORDS,
};
use crate::format::patterns::{
    spaces, AFTER_ARROW_RE, AFTER_CLOSE_PAREN_RE, AFTER_COLON_RE, AFTER_COMMA_RE,
    AFTER_DOUBLE_COLON_RE, AFTER_EQUAL_RE, AFTER_OPEN_PAREN_RE, BEFORE_CLOSE_PAREN_RE,
    BEFORE_COLON_RE, BEFORE_COMMA_RE, BEFORE_DOUBLE_COLON_RE, BEFORE_EQUAL_RE,
    BEFORE_OPEN_PAREN_RE, CLOSE_PAREN_END_RE, CLOSE_PAREN_THEN_RE, SPLIT_ARROW_RE,
    SPLIT_DOUBLE_COLON_RE, TRAILING_SPACES_RE,
};
use crate::tree::{Construct, NodeId, NodeKind, Tree};

/// A blank count, or "leave unchanged"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SpacingRepr", into = "SpacingRepr")]
pub enum Spacing {
    Keep,
    Count(usize),
}

impl Spacing {
    #[must_use]
    pub fn get(self) -> Option<usize> {
        match self {
            Spacing::Keep => None,
            Spacing::Count(n) => Some(n),
        }
    }
}

/// TOML shape of [`Spacing`]: an integer or `"keep"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SpacingRepr {
    Count(usize),
    Word(String),
}

impl TryFrom<SpacingRepr> for Spacing {
    type Error = String;

    fn try_from(repr: SpacingRepr) -> Result<Self, Self::Error> {
        match repr {
            SpacingRepr::Count(n) => Ok(Spacing::Count(n)),
            SpacingRepr::Word(w) if w.eq_ignore_ascii_case("keep") => Ok(Spacing::Keep),
            SpacingRepr::Word(w) => Err(format!(
                "invalid spacing {w:?}: expected a number or \"keep\""
            )),
        }
    }
}

impl From<Spacing> for SpacingRepr {
    fn from(spacing: Spacing) -> Self {
        match spacing {
            Spacing::Keep => SpacingRepr::Word("keep".to_string()),
            Spacing::Count(n) => SpacingRepr::Count(n),
        }
    }
}

/// Keyword table with per-key overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSpacing {
    /// False disables the whole table
    pub enabled: bool,
    /// Values replacing the table defaults
    #[serde(flatten)]
    pub overrides: BTreeMap<String, Spacing>,
}

impl Default for KeywordSpacing {
    fn default() -> Self {
        Self {
            enabled: true,
            overrides: BTreeMap::new(),
        }
    }
}

impl KeywordSpacing {
    fn value(&self, key: &str, default: usize) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        match self.overrides.get(key) {
            Some(spacing) => spacing.get(),
            None => Some(default),
        }
    }
}

/// The full rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpacingRules {
    /// Blanks before and after operators
    pub before_op: Spacing,
    pub after_op: Spacing,
    /// Squeeze blanks inside operator spellings (`. AND .`)
    pub in_operator: bool,
    pub before_comma: Spacing,
    pub after_comma: Spacing,
    pub before_parenthesis: Spacing,
    pub after_parenthesis: Spacing,
    /// Blanks around `=` in assignments and `=>` in associations
    pub before_affectation: Spacing,
    pub after_affectation: Spacing,
    /// Squeeze blanks inside `=` / `= >`
    pub in_affectation: bool,
    /// `:` in array bounds
    pub before_range_delim: Spacing,
    pub after_range_delim: Spacing,
    /// `:` in USE statements
    pub before_use_delim: Spacing,
    pub after_use_delim: Spacing,
    /// `::` in declarations and enumerators
    pub before_decl_delim: Spacing,
    pub after_decl_delim: Spacing,
    /// Collapse `: :` into `::`
    pub in_decl_delim: bool,
    /// After the type of a declaration without `::` (minimum 1)
    pub after_type_decl: Spacing,
    /// `=` in DO and FORALL headers
    pub before_eq_do: Spacing,
    pub after_eq_do: Spacing,
    /// `=` of keyword arguments in CALL
    pub before_eq_call: Spacing,
    pub after_eq_call: Spacing,
    /// `=` of initial values
    pub before_eq_init: Spacing,
    pub after_eq_init: Spacing,
    /// Before a line-end `&` and after a line-begin `&`
    pub before_endcnt: Spacing,
    pub after_begincnt: Spacing,
    /// After IF, ELSE IF, WHERE, ELSEWHERE, SELECT CASE, CASE and FORALL
    pub after_ifwherecase: Spacing,
    pub before_then: Spacing,
    /// Between the condition of a one-line IF/WHERE/FORALL and its action
    pub before_ifaction: Spacing,
    /// Between a program unit keyword and its name (minimum 1)
    pub after_progunit: Spacing,
    /// Strip blanks at the end of lines
    pub end_of_line: bool,
    /// After identifiers, type names and attribute names
    pub after_name: Spacing,
    /// Squeeze blanks inside names
    pub in_name: bool,
    /// Around `;`
    pub before_cmdsep: Spacing,
    pub after_cmdsep: Spacing,
    /// Expand tabs in tails to two blanks
    pub expand_tabs: bool,
    pub adjacent_keywords: KeywordSpacing,
    pub after_keywords: KeywordSpacing,
}

impl Default for SpacingRules {
    fn default() -> Self {
        use Spacing::Count;
        Self {
            before_op: Count(1),
            after_op: Count(1),
            in_operator: true,
            before_comma: Count(0),
            after_comma: Count(1),
            before_parenthesis: Count(0),
            after_parenthesis: Count(0),
            before_affectation: Count(1),
            after_affectation: Count(1),
            in_affectation: true,
            before_range_delim: Count(0),
            after_range_delim: Count(0),
            before_use_delim: Count(0),
            after_use_delim: Count(1),
            before_decl_delim: Count(1),
            after_decl_delim: Count(1),
            in_decl_delim: true,
            after_type_decl: Count(1),
            before_eq_do: Count(0),
            after_eq_do: Count(0),
            before_eq_call: Count(0),
            after_eq_call: Count(0),
            before_eq_init: Count(0),
            after_eq_init: Count(0),
            before_endcnt: Count(1),
            after_begincnt: Count(1),
            after_ifwherecase: Count(1),
            before_then: Count(1),
            before_ifaction: Count(1),
            after_progunit: Count(1),
            end_of_line: true,
            after_name: Count(0),
            in_name: true,
            before_cmdsep: Count(0),
            after_cmdsep: Count(1),
            expand_tabs: true,
            adjacent_keywords: KeywordSpacing::default(),
            after_keywords: KeywordSpacing::default(),
        }
    }
}

fn check_minimum(rule: String, value: Option<usize>, min: usize) -> Result<(), NormalizeError> {
    match value {
        Some(value) if value < min => Err(NormalizeError::SpacingTooSmall { rule, min, value }),
        _ => Ok(()),
    }
}

impl SpacingRules {
    /// Every rule disabled: the pass leaves the tree byte for byte unchanged
    #[must_use]
    pub fn keep_all() -> Self {
        use Spacing::Keep;
        Self {
            before_op: Keep,
            after_op: Keep,
            in_operator: false,
            before_comma: Keep,
            after_comma: Keep,
            before_parenthesis: Keep,
            after_parenthesis: Keep,
            before_affectation: Keep,
            after_affectation: Keep,
            in_affectation: false,
            before_range_delim: Keep,
            after_range_delim: Keep,
            before_use_delim: Keep,
            after_use_delim: Keep,
            before_decl_delim: Keep,
            after_decl_delim: Keep,
            in_decl_delim: false,
            after_type_decl: Keep,
            before_eq_do: Keep,
            after_eq_do: Keep,
            before_eq_call: Keep,
            after_eq_call: Keep,
            before_eq_init: Keep,
            after_eq_init: Keep,
            before_endcnt: Keep,
            after_begincnt: Keep,
            after_ifwherecase: Keep,
            before_then: Keep,
            before_ifaction: Keep,
            after_progunit: Keep,
            end_of_line: false,
            after_name: Keep,
            in_name: false,
            before_cmdsep: Keep,
            after_cmdsep: Keep,
            expand_tabs: false,
            adjacent_keywords: KeywordSpacing {
                enabled: false,
                overrides: BTreeMap::new(),
            },
            after_keywords: KeywordSpacing {
                enabled: false,
                overrides: BTreeMap::new(),
            },
        }
    }

    /// Check minimum spacings and keyword table keys
    pub fn validate(&self) -> Result<(), NormalizeError> {
        check_minimum("after_progunit".to_string(), self.after_progunit.get(), 1)?;
        check_minimum("after_type_decl".to_string(), self.after_type_decl.get(), 1)?;

        for (key, spacing) in &self.adjacent_keywords.overrides {
            let entry = adjacent_keyword(key).ok_or_else(|| NormalizeError::UnknownKey {
                table: "adjacent_keywords",
                key: key.clone(),
            })?;
            if self.adjacent_keywords.enabled {
                check_minimum(
                    format!("adjacent_keywords.{key}"),
                    spacing.get(),
                    entry.minimum,
                )?;
            }
        }
        for (key, spacing) in &self.after_keywords.overrides {
            let entry = after_keyword(key).ok_or_else(|| NormalizeError::UnknownKey {
                table: "after_keywords",
                key: key.clone(),
            })?;
            if self.after_keywords.enabled {
                check_minimum(format!("after_keywords.{key}"), spacing.get(), entry.minimum)?;
            }
        }
        Ok(())
    }
}

/// Replace every match of `re` with a literal string
fn sub(re: &Regex, text: &str, replacement: &str) -> String {
    re.replace_all(text, NoExpand(replacement)).into_owned()
}

/// Replace every match of `re` with a template using `${n}` groups
fn sub_groups(re: &Regex, text: &str, template: &str) -> String {
    re.replace_all(text, template).into_owned()
}

fn rstrip_then(text: &str, n: usize) -> String {
    format!("{}{}", text.trim_end_matches(' '), spaces(n))
}

fn then_lstrip(text: &str, n: usize) -> String {
    format!("{}{}", spaces(n), text.trim_start_matches(' '))
}

fn lstrip_then(text: &str, n: usize) -> String {
    format!("{}{}", text.trim_start_matches(' '), spaces(n))
}

struct Normalizer<'a> {
    tree: &'a mut Tree,
    rules: &'a SpacingRules,
    changed: usize,
}

/// Normalize blanks in the whole tree
///
/// The rules are validated first; on error the tree is untouched.
/// Returns the number of text or tail rewrites that changed something.
#[tracing::instrument(level = "debug", skip_all)]
pub fn update_spaces(tree: &mut Tree, rules: &SpacingRules) -> Result<usize, NormalizeError> {
    rules.validate()?;
    let mut normalizer = Normalizer {
        tree,
        rules,
        changed: 0,
    };
    normalizer.punctuation_and_kinds();
    normalizer.operators_and_conditionals();
    normalizer.continuation_markers();
    normalizer.adjacent_keywords();
    tracing::debug!(changed = normalizer.changed, "spacing updated");
    Ok(normalizer.changed)
}

impl Normalizer<'_> {
    fn edit_tail(&mut self, id: NodeId, f: impl FnOnce(&str) -> String) {
        let updated = f(self.tree.tail(id));
        if updated != self.tree.tail(id) {
            self.changed += 1;
            self.tree.set_tail(id, updated);
        }
    }

    fn edit_text(&mut self, id: NodeId, f: impl FnOnce(&str) -> String) {
        let updated = f(self.tree.text(id));
        if updated != self.tree.text(id) {
            self.changed += 1;
            self.tree.set_text(id, updated);
        }
    }

    /// Apply `f` to the tail, and to the text of code nodes
    fn edit_code(&mut self, id: NodeId, f: impl Fn(&str) -> String) {
        self.edit_tail(id, &f);
        let kind = self.tree.kind(id);
        if !kind.is_non_code() && !self.tree.text(id).is_empty() {
            self.edit_text(id, &f);
        }
    }

    // ===== Pass 1 =====

    fn punctuation_and_kinds(&mut self) {
        let r = self.rules;
        for id in self.tree.preorder() {
            if r.expand_tabs {
                self.edit_tail(id, |t| t.replace('\t', "  "));
            }
            if let Some(n) = r.before_parenthesis.get() {
                self.edit_code(id, |t| {
                    let t = sub(&BEFORE_OPEN_PAREN_RE, t, &format!("{}(", spaces(n)));
                    sub(&BEFORE_CLOSE_PAREN_RE, &t, &format!("{})", spaces(n)))
                });
            }
            if let Some(n) = r.after_parenthesis.get() {
                self.edit_code(id, |t| {
                    let t = sub(&AFTER_OPEN_PAREN_RE, t, &format!("({}", spaces(n)));
                    sub(&AFTER_CLOSE_PAREN_RE, &t, &format!("){}", spaces(n)))
                });
            }
            if let Some(n) = r.before_comma.get() {
                self.edit_code(id, |t| sub(&BEFORE_COMMA_RE, t, &format!("{},", spaces(n))));
            }
            if let Some(n) = r.after_comma.get() {
                self.edit_code(id, |t| sub(&AFTER_COMMA_RE, t, &format!(",{}", spaces(n))));
            }
            if r.end_of_line {
                self.edit_tail(id, |t| sub(&TRAILING_SPACES_RE, t, "\n"));
            }
            self.kind_rules(id);
        }
    }

    fn kind_rules(&mut self, id: NodeId) {
        let r = self.rules;
        let kind = self.tree.kind(id);
        let tail_has = |tree: &Tree, c: char| tree.tail(id).contains(c);

        match kind {
            NodeKind::Name | NodeKind::TypeName | NodeKind::AttributeName => {
                if r.in_name {
                    let parts: Vec<NodeId> = self
                        .tree
                        .children(id)
                        .iter()
                        .copied()
                        .filter(|&c| self.tree.kind(c) == NodeKind::NamePart)
                        .collect();
                    for part in parts {
                        self.edit_tail(part, |t| t.trim_matches(' ').to_string());
                    }
                }
                if let Some(n) = r.after_name.get() {
                    self.edit_tail(id, |t| then_lstrip(t, n));
                }
            }
            NodeKind::LowerBound if tail_has(self.tree, ':') => {
                if let Some(n) = r.before_range_delim.get() {
                    self.edit_tail(id, |t| then_lstrip(t, n));
                }
                if let Some(n) = r.after_range_delim.get() {
                    self.edit_tail(id, |t| rstrip_then(t, n));
                }
            }
            NodeKind::ModuleName if tail_has(self.tree, ':') => {
                if let Some(n) = r.before_use_delim.get() {
                    self.edit_tail(id, |t| sub(&BEFORE_COLON_RE, t, &format!("{}:", spaces(n))));
                }
                if let Some(n) = r.after_use_delim.get() {
                    self.edit_tail(id, |t| sub(&AFTER_COLON_RE, t, &format!(":{}", spaces(n))));
                }
            }
            NodeKind::Attribute | NodeKind::TypeSpec => {
                self.edit_tail(id, |t| self_decl_delim(r, t));
                if kind == NodeKind::TypeSpec {
                    if let Some(n) = r.after_type_decl.get() {
                        self.edit_tail(id, |t| rstrip_then(t, n));
                    }
                }
            }
            NodeKind::EnumeratorStmt if !self.tree.text(id).is_empty() => {
                if self.tree.text(id).contains(':') {
                    self.edit_text(id, |t| self_decl_delim(r, t));
                } else if let Some(n) = r.after_type_decl.get() {
                    self.edit_text(id, |t| rstrip_then(t, n));
                }
            }
            NodeKind::UnitStmt(_) | NodeKind::EndUnitStmt(_) => {
                // Only when a name follows the keyword
                if let Some(n) = r.after_progunit.get() {
                    if self.tree.has_children(id) {
                        self.edit_text(id, |t| rstrip_then(t, n));
                    }
                }
            }
            NodeKind::DoVar | NodeKind::Var if tail_has(self.tree, '=') => {
                self.equal_sign(id, r.before_eq_do, r.after_eq_do);
            }
            NodeKind::ArgName if tail_has(self.tree, '=') => {
                self.equal_sign(id, r.before_eq_call, r.after_eq_call);
            }
            NodeKind::EnumeratorName | NodeKind::NamedConstant
                if tail_has(self.tree, '=') && !self.tree.tail(id).contains("=>") =>
            {
                self.equal_sign(id, r.before_eq_init, r.after_eq_init);
            }
            NodeKind::Separator => {
                if let Some(n) = r.before_cmdsep.get() {
                    let previous = self
                        .tree
                        .index_in_parent(id)
                        .and_then(|(p, i)| i.checked_sub(1).map(|i| self.tree.children(p)[i]));
                    if let Some(prev) = previous {
                        self.edit_tail(prev, |t| then_lstrip(t, n));
                    }
                }
                if let Some(n) = r.after_cmdsep.get() {
                    self.edit_tail(id, |t| rstrip_then(t, n));
                }
            }
            NodeKind::AssociateName if tail_has(self.tree, '=') => {
                if let Some(n) = r.before_affectation.get() {
                    self.edit_tail(id, |t| sub(&BEFORE_EQUAL_RE, t, &format!("{}=", spaces(n))));
                }
                if let Some(n) = r.after_affectation.get() {
                    self.edit_tail(id, |t| sub(&AFTER_ARROW_RE, t, &format!(">{}", spaces(n))));
                }
                if r.in_affectation {
                    self.edit_tail(id, |t| sub(&SPLIT_ARROW_RE, t, "=>"));
                }
            }
            _ => {
                if let Some(entry) = after_keyword_for(kind) {
                    let count = r.after_keywords.value(entry.key, entry.default);
                    if let Some(n) = count {
                        if self.tree.has_children(id) {
                            self.edit_text(id, |t| entry.apply(t, n));
                        }
                    }
                }
            }
        }
    }

    fn equal_sign(&mut self, id: NodeId, before: Spacing, after: Spacing) {
        if let Some(n) = before.get() {
            self.edit_tail(id, |t| sub(&BEFORE_EQUAL_RE, t, &format!("{}=", spaces(n))));
        }
        if let Some(n) = after.get() {
            self.edit_tail(id, |t| sub(&AFTER_EQUAL_RE, t, &format!("={}", spaces(n))));
        }
    }

    // ===== Pass 2 =====

    fn operators_and_conditionals(&mut self) {
        for id in self.tree.preorder() {
            match self.tree.kind(id) {
                NodeKind::OpExpr => self.operators(id),
                NodeKind::AssignStmt | NodeKind::PointerAssignStmt => self.affectations(id),
                NodeKind::IfStmt
                | NodeKind::IfThenStmt
                | NodeKind::ElseIfStmt
                | NodeKind::WhereStmt
                | NodeKind::WhereConstructStmt
                | NodeKind::ElseWhereStmt
                | NodeKind::SelectCaseStmt
                | NodeKind::CaseStmt
                | NodeKind::ForallStmt
                | NodeKind::ConstructStmt(Construct::Forall) => self.conditional(id),
                _ => {}
            }
        }
    }

    /// Spacing of `children` entries of kind `kind`: blanks before (in the
    /// previous sibling's tail) and after (in their own tail)
    fn around_children(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        before: Spacing,
        after: Spacing,
    ) -> Vec<NodeId> {
        let children = self.tree.children(parent).to_vec();
        let mut matched = Vec::new();
        for (i, &child) in children.iter().enumerate() {
            if self.tree.kind(child) != kind {
                continue;
            }
            if let (Some(n), Some(&prev)) = (before.get(), i.checked_sub(1).and_then(|p| children.get(p))) {
                self.edit_tail(prev, |t| rstrip_then(t, n));
            }
            if let Some(n) = after.get() {
                self.edit_tail(child, |t| lstrip_then(t, n));
            }
            matched.push(child);
        }
        matched
    }

    fn operators(&mut self, id: NodeId) {
        let r = self.rules;
        let ops = self.around_children(id, NodeKind::Op, r.before_op, r.after_op);
        if r.in_operator {
            for op in ops {
                let spellings: Vec<NodeId> = self
                    .tree
                    .children(op)
                    .iter()
                    .copied()
                    .filter(|&c| self.tree.kind(c) == NodeKind::OpSpelling)
                    .collect();
                for spelling in spellings {
                    self.edit_tail(spelling, |t| t.trim_matches(' ').to_string());
                }
            }
        }
    }

    fn affectations(&mut self, id: NodeId) {
        let r = self.rules;
        let signs = self.around_children(
            id,
            NodeKind::Affectation,
            r.before_affectation,
            r.after_affectation,
        );
        if r.in_affectation {
            for sign in signs {
                self.edit_text(sign, |t| t.replace(' ', ""));
            }
        }
    }

    fn conditional(&mut self, id: NodeId) {
        let r = self.rules;
        let kind = self.tree.kind(id);

        if let Some(n) = r.after_ifwherecase.get() {
            if kind == NodeKind::CaseStmt {
                // The selector is a child; CASE DEFAULT has none
                if self.tree.has_children(id) {
                    self.edit_text(id, |t| rstrip_then(t, n));
                }
            } else {
                self.edit_text(id, |t| {
                    BEFORE_OPEN_PAREN_RE
                        .replace(t, NoExpand(&format!("{}(", spaces(n))))
                        .into_owned()
                });
            }
        }

        match kind {
            NodeKind::IfThenStmt | NodeKind::ElseIfStmt => {
                if let (Some(n), Some(cond)) = (
                    r.before_then.get(),
                    self.tree.child_of_kind(id, NodeKind::Condition),
                ) {
                    let template = format!("){}${{1}}", spaces(n));
                    self.edit_tail(cond, |t| sub_groups(&CLOSE_PAREN_THEN_RE, t, &template));
                }
            }
            NodeKind::IfStmt => self.before_action(id, NodeKind::Condition),
            NodeKind::WhereStmt => self.before_action(id, NodeKind::Mask),
            NodeKind::ForallStmt => self.before_action(id, NodeKind::ForallTriplets),
            _ => {}
        }
    }

    /// Blanks between the closing parenthesis of a one-line header and its action
    fn before_action(&mut self, id: NodeId, part: NodeKind) {
        if let (Some(n), Some(node)) = (
            self.rules.before_ifaction.get(),
            self.tree.child_of_kind(id, part),
        ) {
            self.edit_tail(node, |t| sub(&CLOSE_PAREN_END_RE, t, &format!("){}", spaces(n))));
        }
    }

    // ===== Pass 3 =====

    /// The text before a marker is the previous sibling's tail, or the
    /// parent's text for a first child
    fn continuation_markers(&mut self) {
        let r = self.rules;
        if r.before_endcnt.get().is_none() && r.after_begincnt.get().is_none() {
            return;
        }
        for parent in self.tree.preorder() {
            let children = self.tree.children(parent).to_vec();
            for (i, &marker) in children.iter().enumerate() {
                if self.tree.kind(marker) != NodeKind::Continuation {
                    continue;
                }
                let previous = i.checked_sub(1).map(|p| children[p]);
                let before = match previous {
                    Some(p) => self.tree.tail(p),
                    None => self.tree.text(parent),
                };
                let starts_line = before.contains('\n');
                let alone = starts_line && self.tree.tail(marker).contains('\n');

                if alone {
                    continue;
                }
                if starts_line {
                    if let Some(n) = r.after_begincnt.get() {
                        self.edit_tail(marker, |t| then_lstrip(t, n));
                    }
                } else if let Some(n) = r.before_endcnt.get() {
                    match previous {
                        Some(p) => self.edit_tail(p, |t| rstrip_then(t, n)),
                        None => self.edit_text(parent, |t| rstrip_then(t, n)),
                    }
                }
            }
        }
    }

    // ===== Pass 4 =====

    fn adjacent_keywords(&mut self) {
        let table = &self.rules.adjacent_keywords;
        if !table.enabled {
            return;
        }
        let nodes = self.tree.preorder();
        for entry in &ADJACENT_KEYWORDS {
            let Some(count) = table.value(entry.key, entry.default) else {
                continue;
            };
            for &id in &nodes {
                let matches = match entry.target {
                    KeywordTarget::Kind(kind) => self.tree.kind(id) == kind,
                    KeywordTarget::IntrinsicTypeName => {
                        self.tree.kind(id) == NodeKind::TypeName
                            && self
                                .tree
                                .parent(id)
                                .is_some_and(|p| self.tree.kind(p) == NodeKind::IntrinsicTypeSpec)
                    }
                };
                if matches {
                    self.edit_text(id, |t| entry.apply(t, count));
                }
            }
        }
    }
}

/// `::` rules shared by declarations and enumerators
fn self_decl_delim(r: &SpacingRules, text: &str) -> String {
    let mut out = text.to_string();
    if r.in_decl_delim {
        out = sub(&SPLIT_DOUBLE_COLON_RE, &out, "::");
    }
    if let Some(n) = r.before_decl_delim.get() {
        out = sub_groups(&BEFORE_DOUBLE_COLON_RE, &out, &format!("{}${{1}}", spaces(n)));
    }
    if let Some(n) = r.after_decl_delim.get() {
        out = sub_groups(&AFTER_DOUBLE_COLON_RE, &out, &format!("${{1}}{}", spaces(n)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;
    use pretty_assertions::assert_eq;

    fn normalized(tree: &mut Tree) -> String {
        update_spaces(tree, &SpacingRules::default()).unwrap();
        tree.to_source()
    }

    #[test]
    fn test_keep_all_is_a_noop() {
        let mut b = TreeBuilder::new("file");
        b.start("a-stmt")
            .leaf("E-1", "X")
            .text("\t=  ")
            .leaf("E-2", "F ( A ,B )")
            .text("   \n")
            .finish();
        let mut tree = b.build();
        let before = tree.to_source();
        let changed = update_spaces(&mut tree, &SpacingRules::keep_all()).unwrap();
        assert_eq!(changed, 0);
        assert_eq!(tree.to_source(), before);
    }

    #[test]
    fn test_parentheses_commas_and_end_of_line() {
        let mut b = TreeBuilder::new("file");
        b.start("call-stmt")
            .text("CALL FOO ( A ,B )   ")
            .finish()
            .text("   \n");
        let mut tree = b.build();
        assert_eq!(normalized(&mut tree), "CALL FOO(A, B)\n");
    }

    #[test]
    fn test_strings_and_comments_untouched() {
        let mut b = TreeBuilder::new("file");
        b.start("print-stmt")
            .text("PRINT")
            .leaf("S", "'a ( b ,c'")
            .finish()
            .text(" ")
            .leaf("C", "! x ( y ,z")
            .text("\n");
        let mut tree = b.build();
        assert_eq!(normalized(&mut tree), "PRINT'a ( b ,c' ! x ( y ,z\n");
    }

    #[test]
    fn test_assignment_and_operators() {
        let mut b = TreeBuilder::new("file");
        b.start("a-stmt")
            .leaf("E-1", "X")
            .leaf("a", "=")
            .start("op-E")
            .leaf("E", "A")
            .start("op")
            .leaf("o", "+")
            .finish()
            .leaf("E", "B")
            .finish()
            .finish()
            .text("\n");
        let mut tree = b.build();
        assert_eq!(normalized(&mut tree), "X = A + B\n");
    }

    #[test]
    fn test_if_then() {
        let mut b = TreeBuilder::new("file");
        b.start("if-then-stmt")
            .text("IF(")
            .leaf("condition-E", "A")
            .text(")THEN")
            .finish()
            .text("\n");
        let mut tree = b.build();
        assert_eq!(normalized(&mut tree), "IF (A) THEN\n");
    }

    #[test]
    fn test_declaration_delimiter() {
        let mut b = TreeBuilder::new("file");
        b.start("T-decl-stmt")
            .start("_T-spec_")
            .leaf("intrinsic-T-spec", "INTEGER")
            .finish()
            .text(": :")
            .leaf("EN-decl", "X")
            .finish()
            .text("\n");
        let mut tree = b.build();
        assert_eq!(normalized(&mut tree), "INTEGER :: X\n");
    }

    #[test]
    fn test_adjacent_keywords_with_override() {
        let mut b = TreeBuilder::new("file");
        b.leaf("end-do-stmt", "ENDDO")
            .text("\n")
            .leaf("end-if-stmt", "END   IF")
            .text("\n")
            .leaf("implicit-none-stmt", "IMPLICITNONE")
            .text("\n");
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.adjacent_keywords.enabled = true;
        rules
            .adjacent_keywords
            .overrides
            .insert("end_if".to_string(), Spacing::Count(0));
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "END DO\nENDIF\nIMPLICIT NONE\n");
    }

    #[test]
    fn test_continuation_marker_spacing() {
        let mut b = TreeBuilder::new("file");
        b.start("call-stmt")
            .text("CALL FOO(A,")
            .leaf("cnt", "&")
            .text("\n  ")
            .leaf("cnt", "&")
            .text("B)")
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_endcnt = Spacing::Count(1);
        rules.after_begincnt = Spacing::Count(1);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "CALL FOO(A, &\n  & B)");
    }

    #[test]
    fn test_do_while_keeps_parenthesis_spacing() {
        let mut b = TreeBuilder::new("file");
        b.start("do-construct")
            .start("do-stmt")
            .text("DO WHILE (")
            .leaf("named-E", "X")
            .text(")")
            .finish()
            .text("\n")
            .leaf("end-do-stmt", "END DO")
            .finish();
        let mut tree = b.build();
        assert_eq!(normalized(&mut tree), "DO WHILE(X)\nEND DO");
    }

    #[test]
    fn test_do_keyword_spacing() {
        let mut b = TreeBuilder::new("file");
        b.start("do-stmt")
            .text("DO   ")
            .leaf("do-V", "I")
            .text("=1, N")
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.after_keywords.enabled = true;
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "DO I=1, N");
    }

    #[test]
    fn test_range_delimiter() {
        let mut b = TreeBuilder::new("file");
        b.start("shape-spec")
            .leaf("lower-bound", "1")
            .text(" : ")
            .leaf("upper-bound", "N")
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_range_delim = Spacing::Count(0);
        rules.after_range_delim = Spacing::Count(0);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "1:N");
    }

    #[test]
    fn test_use_delimiter() {
        let mut b = TreeBuilder::new("file");
        b.start("use-stmt")
            .text("USE ")
            .leaf("module-N", "M")
            .text(", ONLY :X")
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_use_delim = Spacing::Count(0);
        rules.after_use_delim = Spacing::Count(1);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "USE M, ONLY: X");
    }

    #[test]
    fn test_equal_sign_in_do_header() {
        let mut b = TreeBuilder::new("file");
        b.start("do-stmt")
            .text("DO ")
            .leaf("do-V", "I")
            .text(" = ")
            .leaf("lower-bound", "1")
            .text(", ")
            .leaf("upper-bound", "N")
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_eq_do = Spacing::Count(0);
        rules.after_eq_do = Spacing::Count(0);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "DO I=1, N");
    }

    #[test]
    fn test_equal_sign_of_keyword_argument() {
        let mut b = TreeBuilder::new("file");
        b.start("call-stmt")
            .text("CALL F(")
            .leaf("arg-N", "K")
            .text("=")
            .leaf("named-E", "1")
            .text(")")
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_eq_call = Spacing::Count(1);
        rules.after_eq_call = Spacing::Count(1);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "CALL F(K = 1)");
    }

    #[test]
    fn test_equal_sign_of_initial_value() {
        let mut b = TreeBuilder::new("file");
        b.start("T-decl-stmt")
            .text("INTEGER :: ")
            .start("EN-decl")
            .leaf("EN-N", "X")
            .text(" =  ")
            .leaf("literal-E", "1")
            .finish()
            .text(", ")
            .start("EN-decl")
            .leaf("EN-N", "P")
            .text(" => ")
            .leaf("named-E", "NULL()")
            .finish()
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_eq_init = Spacing::Count(0);
        rules.after_eq_init = Spacing::Count(0);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "INTEGER :: X=1, P => NULL()");
    }

    #[test]
    fn test_command_separator() {
        let mut b = TreeBuilder::new("file");
        b.leaf("a-stmt", "X=1")
            .text("  ")
            .leaf("smc", ";")
            .text("   ")
            .leaf("a-stmt", "Y=2");
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_cmdsep = Spacing::Count(0);
        rules.after_cmdsep = Spacing::Count(1);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "X=1; Y=2");
    }

    #[test]
    fn test_association_arrow() {
        let mut b = TreeBuilder::new("file");
        b.start("associate-stmt")
            .text("ASSOCIATE(")
            .leaf("associate-N", "A")
            .text("= >  ")
            .leaf("named-E", "B%C")
            .text(")")
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_affectation = Spacing::Count(1);
        rules.after_affectation = Spacing::Count(1);
        rules.in_affectation = true;
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "ASSOCIATE(A => B%C)");
    }

    #[test]
    fn test_before_action_of_where_and_forall() {
        let mut b = TreeBuilder::new("file");
        b.start("where-stmt")
            .text("WHERE (")
            .leaf("mask-E", "A>0")
            .text(")   ")
            .start("action-stmt")
            .leaf("a-stmt", "B=0")
            .finish()
            .finish()
            .text("\n")
            .start("forall-stmt")
            .text("FORALL (")
            .leaf("forall-triplet-spec-LT", "I=1:N")
            .text(")")
            .start("action-stmt")
            .leaf("a-stmt", "X(I)=0")
            .finish()
            .finish();
        let mut tree = b.build();
        let mut rules = SpacingRules::keep_all();
        rules.before_ifaction = Spacing::Count(1);
        update_spaces(&mut tree, &rules).unwrap();
        assert_eq!(tree.to_source(), "WHERE (A>0) B=0\nFORALL (I=1:N) X(I)=0");
    }

    #[test]
    fn test_validation() {
        let mut rules = SpacingRules::default();
        rules.after_progunit = Spacing::Count(0);
        assert!(matches!(
            rules.validate(),
            Err(NormalizeError::SpacingTooSmall { min: 1, value: 0, .. })
        ));

        let mut rules = SpacingRules::default();
        rules
            .adjacent_keywords
            .overrides
            .insert("module_procedure".to_string(), Spacing::Count(0));
        assert!(rules.validate().is_err());

        let mut rules = SpacingRules::default();
        rules
            .adjacent_keywords
            .overrides
            .insert("end_loop".to_string(), Spacing::Count(1));
        assert_eq!(
            rules.validate(),
            Err(NormalizeError::UnknownKey {
                table: "adjacent_keywords",
                key: "end_loop".to_string()
            })
        );

        let mut rules = SpacingRules::default();
        rules
            .after_keywords
            .overrides
            .insert("call".to_string(), Spacing::Count(0));
        assert!(rules.validate().is_err());
        rules
            .after_keywords
            .overrides
            .insert("call".to_string(), Spacing::Keep);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_spacing_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            a: Spacing,
            b: Spacing,
        }
        let w: Wrapper = toml::from_str("a = 2\nb = \"keep\"").unwrap();
        assert_eq!(w.a, Spacing::Count(2));
        assert_eq!(w.b, Spacing::Keep);
        assert!(toml::from_str::<Wrapper>("a = 2\nb = \"wide\"").is_err());
    }
}
