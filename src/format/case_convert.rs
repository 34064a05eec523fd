//! Case conversion of Fortran code text
//!
//! Only node text is converted: tails hold blanks and punctuation, and
//! comments, directives and string literals are left as written.

use serde::{Deserialize, Serialize};

use crate::tree::Tree;

/// Case conversion mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    #[default]
    #[serde(alias = "keep")]
    NoChange,
    Lower,
    Upper,
}

/// Apply `mode` to every code node; returns the number of nodes changed
#[tracing::instrument(level = "debug", skip(tree))]
pub fn convert_case(tree: &mut Tree, mode: CaseMode) -> usize {
    let convert: fn(&str) -> String = match mode {
        CaseMode::NoChange => return 0,
        CaseMode::Lower => str::to_lowercase,
        CaseMode::Upper => str::to_uppercase,
    };
    let mut changed = 0;
    for id in tree.preorder() {
        if tree.kind(id).is_non_code() || tree.text(id).is_empty() {
            continue;
        }
        let converted = convert(tree.text(id));
        if converted != tree.text(id) {
            tree.set_text(id, converted);
            changed += 1;
        }
    }
    changed
}

/// Upper-case every code node
pub fn upper_case(tree: &mut Tree) -> usize {
    convert_case(tree, CaseMode::Upper)
}

/// Lower-case every code node
pub fn lower_case(tree: &mut Tree) -> usize {
    convert_case(tree, CaseMode::Lower)
}
