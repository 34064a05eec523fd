//! CST normalization passes.
//!
//! This module contains the passes, each operating on a [`crate::tree::Tree`] in place:
//! - [`indenter`]: Re-indents lines from construct nesting (units, branches, constructs)
//! - [`continuation`]: Inserts, removes and aligns continuation markers
//! - [`aligner`]: Anchor tables giving the alignment column of continued lines
//! - [`whitespace`]: Applies spacing rules around operators, punctuation and keywords
//! - [`keywords`]: Adjacent keyword and after-keyword tables used by [`whitespace`]
//! - [`comments`]: Removes comments, keeping directive-like ones
//! - [`rewrite`]: One-line IF conversion, empty CONTAINS and blank line removal
//! - [`case_convert`]: Upper or lower case folding of code text

pub mod aligner;
pub mod case_convert;
pub mod comments;
pub mod continuation;
pub mod indenter;
pub mod keywords;
pub mod patterns;
pub mod rewrite;
pub mod whitespace;

pub use aligner::{alignment_column, AnchorClass};
pub use case_convert::{convert_case, lower_case, upper_case, CaseMode};
pub use comments::{remove_comments, CommentOptions};
pub use continuation::{update_continuation, ContinuationOptions, ContinuationReport};
pub use indenter::{indent, indent_subtree, IndentParams};
pub use rewrite::{convert_if_statements, remove_empty_contains, remove_empty_lines};
pub use whitespace::{update_spaces, KeywordSpacing, Spacing, SpacingRules};
