/// Regex patterns shared by the formatting passes
///
/// All patterns are compiled once at first use using `LazyLock`.
///
/// All regexes use case-insensitive + unicode flags
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Build a case-insensitive regex from a compile-time constant pattern.
///
/// # Panics
///
/// Panics if the pattern is invalid. All patterns in this module are
/// compile-time constants covered by tests, so this can only fire on a
/// programming error at first access of the `LazyLock` static.
pub(crate) fn build_re(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(true)
        .build()
        .unwrap_or_else(|_| panic!("Invalid regex pattern: {pattern}"))
}

/// `n` space characters
#[must_use]
pub fn spaces(n: usize) -> String {
    " ".repeat(n)
}

// ===== LINE STRUCTURE =====

/// A newline and the indentation that follows it
pub static NEWLINE_INDENT_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\n[ ]*"));
/// Trailing spaces before a newline
pub static TRAILING_SPACES_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[ ]*\n"));
/// A run of blank lines
pub static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\n[ \n]*\n"));

// ===== PUNCTUATION =====

pub static BEFORE_OPEN_PAREN_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[ ]*\("));
pub static BEFORE_CLOSE_PAREN_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[ ]*\)"));
pub static AFTER_OPEN_PAREN_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\([ ]*"));
pub static AFTER_CLOSE_PAREN_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\)[ ]*"));
pub static BEFORE_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[ ]*,"));
pub static AFTER_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r",[ ]*"));
pub static BEFORE_COLON_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[ ]*:"));
pub static AFTER_COLON_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r":[ ]*"));
pub static BEFORE_EQUAL_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[ ]*="));
pub static AFTER_EQUAL_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"=[ ]*"));

// ===== DELIMITERS =====

/// `: :` written with inner blanks
pub static SPLIT_DOUBLE_COLON_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r":[ ]*:"));
pub static BEFORE_DOUBLE_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"[ ]*(:[ ]*:)"));
pub static AFTER_DOUBLE_COLON_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"(:[ ]*:)[ ]*"));
/// `= >` written with inner blanks
pub static SPLIT_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"=[ ]*>"));
pub static AFTER_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r">[ ]*"));

// ===== CONDITIONALS =====

/// Closing parenthesis of an IF condition followed by THEN
pub static CLOSE_PAREN_THEN_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"\)[ ]*([a-zA-Z]*$)"));
/// Closing parenthesis at the end of a condition, mask or triplet list
pub static CLOSE_PAREN_END_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\)[ ]*$"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        for re in [
            &NEWLINE_INDENT_RE,
            &TRAILING_SPACES_RE,
            &BLANK_LINES_RE,
            &BEFORE_OPEN_PAREN_RE,
            &BEFORE_CLOSE_PAREN_RE,
            &AFTER_OPEN_PAREN_RE,
            &AFTER_CLOSE_PAREN_RE,
            &BEFORE_COMMA_RE,
            &AFTER_COMMA_RE,
            &BEFORE_COLON_RE,
            &AFTER_COLON_RE,
            &BEFORE_EQUAL_RE,
            &AFTER_EQUAL_RE,
            &SPLIT_DOUBLE_COLON_RE,
            &BEFORE_DOUBLE_COLON_RE,
            &AFTER_DOUBLE_COLON_RE,
            &SPLIT_ARROW_RE,
            &AFTER_ARROW_RE,
            &CLOSE_PAREN_THEN_RE,
            &CLOSE_PAREN_END_RE,
        ] {
            assert!(!re.as_str().is_empty());
        }
    }

    #[test]
    fn test_then_pattern() {
        let out = CLOSE_PAREN_THEN_RE.replace("(A)   THEN", ") ${1}");
        assert_eq!(out, "(A) THEN");
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(BLANK_LINES_RE.replace_all("\n  \n\n  X", "\n"), "\n  X");
    }
}
