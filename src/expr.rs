//! Expression helpers
//!
//! Small builders for expression nodes and a simplifier for sums of terms.
//! Anything beyond these shapes needs the external parser.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::NormalizeError;
use crate::format::patterns::build_re;
use crate::tree::{NodeId, Tree};

/// A `+` or `-` between parentheses
static SIGN_IN_PARENS_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\([^()]*[+-][^()]*\)"));

/// `A%B`
static COMPONENT_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^[a-zA-Z_][a-zA-Z0-9_]*%[a-zA-Z_][a-zA-Z0-9_]*$"));

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    negative: bool,
    operand: String,
}

impl Term {
    fn sort_key(&self) -> String {
        format!("{}{}", if self.negative { '-' } else { '+' }, self.operand)
    }

    fn integer(&self) -> Option<i64> {
        let value: i64 = self.operand.parse().ok()?;
        Some(if self.negative { -value } else { value })
    }
}

/// Split `1+I-J` into signed terms, upper-cased and without blanks
fn split_terms(expr: &str) -> Vec<Term> {
    let compact: String = expr
        .chars()
        .filter(|c| *c != ' ')
        .collect::<String>()
        .to_uppercase();

    let mut terms = Vec::new();
    let mut negative = false;
    let mut operand = String::new();
    for c in compact.chars() {
        if c == '+' || c == '-' {
            if !operand.is_empty() {
                terms.push(Term {
                    negative,
                    operand: std::mem::take(&mut operand),
                });
            }
            negative = c == '-';
        } else {
            operand.push(c);
        }
    }
    if !operand.is_empty() {
        terms.push(Term { negative, operand });
    }
    terms
}

fn check_parentheses(text: &str) -> Result<(), NormalizeError> {
    if SIGN_IN_PARENS_RE.is_match(text) {
        return Err(NormalizeError::Unsupported {
            reason: "addition or subtraction inside parentheses",
            text: text.to_string(),
        });
    }
    Ok(())
}

/// Simplify a sum of terms, optionally adding `add` and subtracting `sub`
///
/// Only `+` and `-` are understood: opposite terms cancel, integers are
/// summed and the terms are sorted. `simplify_expr("1+1+I+JI-I", None,
/// None)` gives `"2+JI"`, and an empty result is `"0"`.
pub fn simplify_expr(
    expr: &str,
    add: Option<&str>,
    sub: Option<&str>,
) -> Result<String, NormalizeError> {
    for text in [Some(expr), add, sub].into_iter().flatten() {
        check_parentheses(text)?;
    }

    let mut terms = split_terms(expr);
    if let Some(add) = add {
        terms.extend(split_terms(add));
    }
    if let Some(sub) = sub {
        terms.extend(split_terms(sub).into_iter().map(|t| Term {
            negative: !t.negative,
            ..t
        }));
    }

    let mut kept: Vec<Term> = Vec::with_capacity(terms.len());
    for term in terms {
        let opposite = kept
            .iter()
            .position(|k| k.operand == term.operand && k.negative != term.negative);
        match opposite {
            Some(i) => {
                kept.remove(i);
            }
            None => kept.push(term),
        }
    }

    // All integer terms fold into the first one
    let total = kept
        .iter()
        .filter_map(Term::integer)
        .try_fold(0_i64, i64::checked_add)
        .ok_or_else(|| NormalizeError::Unsupported {
            reason: "integer overflow",
            text: expr.to_string(),
        })?;
    let first_integer = kept.iter().position(|t| t.integer().is_some());
    let mut simplified: Vec<Term> = Vec::with_capacity(kept.len());
    for (i, term) in kept.into_iter().enumerate() {
        if term.integer().is_none() {
            simplified.push(term);
        } else if Some(i) == first_integer && total != 0 {
            simplified.push(Term {
                negative: total < 0,
                operand: total.unsigned_abs().to_string(),
            });
        }
    }

    simplified.sort_by_key(Term::sort_key);
    if simplified.is_empty() {
        return Ok("0".to_string());
    }

    let mut out = String::new();
    for (i, term) in simplified.iter().enumerate() {
        if term.negative {
            out.push('-');
        } else if i > 0 {
            out.push('+');
        }
        out.push_str(&term.operand);
    }
    Ok(out)
}

fn is_number(value: &str) -> bool {
    if value.parse::<i64>().is_ok() {
        return true;
    }
    // Rust also parses "inf" and "nan", which are names in Fortran
    value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'))
        && value.parse::<f64>().is_ok()
}

fn is_name(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build a detached expression node for `value`
///
/// - a number, `.TRUE.` or `.FALSE.`: `literal-E` / `l`
/// - a string (contains a quote): `string-E` / `S`
/// - a name: `named-E` / `N` / `n`
/// - `A%B`: `named-E` with an `R-LT` / `component-R` / `ct` reference
pub fn create_expr_part(tree: &mut Tree, value: &str) -> Result<NodeId, NormalizeError> {
    let upper = value.to_uppercase();
    if is_number(value) || upper == ".TRUE." || upper == ".FALSE." {
        let literal = tree.new_leaf("l", value);
        let node = tree.new_node("literal-E");
        tree.append_child(node, literal);
        Ok(node)
    } else if value.contains('\'') || value.contains('"') {
        let string = tree.new_leaf("S", value);
        let node = tree.new_node("string-E");
        tree.append_child(node, string);
        Ok(node)
    } else if is_name(value) {
        let name = new_name(tree, value);
        let node = tree.new_node("named-E");
        tree.append_child(node, name);
        Ok(node)
    } else if COMPONENT_RE.is_match(value) {
        let (base, component) = value.split_once('%').unwrap_or((value, ""));
        let name = new_name(tree, base);
        let ct = tree.new_leaf("ct", component);
        let reference = tree.new_leaf("component-R", "%");
        tree.append_child(reference, ct);
        let list = tree.new_node("R-LT");
        tree.append_child(list, reference);
        let node = tree.new_node("named-E");
        tree.append_child(node, name);
        tree.append_child(node, list);
        Ok(node)
    } else {
        Err(NormalizeError::Unsupported {
            reason: "expression needs the parser",
            text: value.to_string(),
        })
    }
}

fn new_name(tree: &mut Tree, value: &str) -> NodeId {
    let part = tree.new_leaf("n", value);
    let name = tree.new_node("N");
    tree.append_child(name, part);
    name
}

/// Where a pair of bounds is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsContext {
    /// `DO I = lower, upper`
    Do,
    /// `DO CONCURRENT (I = lower:upper)`
    DoConcurrent,
    /// `A(lower:upper)`
    Array,
}

impl BoundsContext {
    fn separator(self) -> &'static str {
        match self {
            BoundsContext::Do => ", ",
            BoundsContext::DoConcurrent | BoundsContext::Array => ":",
        }
    }
}

/// Build detached `lower-bound` and `upper-bound` nodes
pub fn create_array_bounds(
    tree: &mut Tree,
    lower: &str,
    upper: &str,
    context: BoundsContext,
) -> Result<(NodeId, NodeId), NormalizeError> {
    let lower_expr = create_expr_part(tree, lower)?;
    let upper_expr = create_expr_part(tree, upper)?;

    let lower_bound = tree.new_node("lower-bound");
    tree.append_child(lower_bound, lower_expr);
    tree.set_tail(lower_bound, context.separator());

    let upper_bound = tree.new_node("upper-bound");
    tree.append_child(upper_bound, upper_expr);
    Ok((lower_bound, upper_bound))
}
