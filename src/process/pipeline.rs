//! Normalization pipeline
//!
//! Runs the enabled passes on one tree in a fixed order:
//! - Structural edits: comments, one-line IFs, empty CONTAINS, blank lines
//! - Spacing, then indentation
//! - Continuation markers, aligned on the final text of each first line
//! - Case folding

use std::io::{Read, Write};

use crate::config::Config;
use crate::error::{NormalizeError, Result};
use crate::format::{
    convert_case, convert_if_statements, indent, remove_comments, remove_empty_contains,
    remove_empty_lines, update_continuation, update_spaces, ContinuationReport,
};
use crate::tree::{RawNode, Tree};

/// Output format of [`format_cst`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Emit {
    /// Fortran source text
    #[default]
    Fortran,
    /// The normalized tree, in the input JSON shape
    Json,
}

/// Counts reported by each pass of [`normalize`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub comments_removed: usize,
    pub if_statements_converted: usize,
    pub contains_removed: usize,
    pub blank_line_edits: usize,
    pub spacing_edits: usize,
    pub indent_edits: usize,
    pub continuation: ContinuationReport,
    pub case_edits: usize,
}

/// Normalize `tree` in place
///
/// The whole configuration is validated first, so a usage error never
/// leaves a half-normalized tree behind.
#[tracing::instrument(level = "debug", skip_all)]
pub fn normalize(
    tree: &mut Tree,
    config: &Config,
) -> std::result::Result<NormalizeReport, NormalizeError> {
    config.validate()?;
    let passes = &config.passes;
    let mut report = NormalizeReport::default();

    if passes.remove_comments {
        report.comments_removed = remove_comments(tree, &config.comments);
    }
    if passes.convert_if_statements {
        report.if_statements_converted = convert_if_statements(tree, None, None);
    }
    if passes.remove_empty_contains {
        report.contains_removed = remove_empty_contains(tree);
    }
    if passes.remove_empty_lines {
        report.blank_line_edits = remove_empty_lines(tree);
    }
    if passes.spacing {
        report.spacing_edits = update_spaces(tree, &config.spacing)?;
    }
    if passes.indent {
        report.indent_edits = indent(tree, &config.indent);
    }
    if passes.continuation {
        report.continuation = update_continuation(tree, None, config.continuation)?;
    }
    report.case_edits = convert_case(tree, passes.case);

    tracing::debug!(?report, "tree normalized");
    Ok(report)
}

/// Read a JSON CST, normalize it and write the result
pub fn format_cst<R: Read, W: Write>(
    input: R,
    output: &mut W,
    config: &Config,
    emit: Emit,
) -> Result<NormalizeReport> {
    let raw: RawNode = serde_json::from_reader(input)?;
    let mut tree = Tree::from_raw(&raw);
    let report = normalize(&mut tree, config)?;
    match emit {
        Emit::Fortran => tree.write_source(output)?,
        Emit::Json => {
            serde_json::to_writer_pretty(&mut *output, &tree.to_raw())?;
            output.write_all(b"\n")?;
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::format::SpacingRules;
    use crate::tree::TreeBuilder;
    use pretty_assertions::assert_eq;

    const LOOP_JSON: &str = r#"{
  "tag": "file",
  "children": [
    {
      "tag": "do-construct",
      "children": [
        { "tag": "do-stmt", "text": "DO I=1,N", "tail": "\n" },
        {
          "tag": "a-stmt",
          "tail": "\n",
          "children": [
            { "tag": "E-1", "text": "X" },
            { "tag": "a", "text": "=" },
            { "tag": "E-2", "text": "I" }
          ]
        },
        { "tag": "end-do-stmt", "text": "ENDDO" }
      ],
      "tail": "\n"
    }
  ]
}"#;

    #[test]
    fn test_format_cst_default_config() {
        let mut output = Vec::new();
        format_cst(
            Cursor::new(LOOP_JSON),
            &mut output,
            &Config::default(),
            Emit::Fortran,
        )
        .unwrap();
        let result = String::from_utf8(output).unwrap();
        assert_eq!(result, "DO I=1, N\n  X = I\nEND DO\n");
    }

    #[test]
    fn test_format_cst_json_round_trip() {
        let mut config = Config::default();
        config.passes.spacing = false;
        config.passes.indent = false;
        config.passes.continuation = false;

        let mut output = Vec::new();
        format_cst(Cursor::new(LOOP_JSON), &mut output, &config, Emit::Json).unwrap();
        let raw: RawNode = serde_json::from_slice(&output).unwrap();
        let expected: RawNode = serde_json::from_str(LOOP_JSON).unwrap();
        assert_eq!(raw, expected);
    }

    #[test]
    fn test_invalid_config_leaves_tree_untouched() {
        let mut b = TreeBuilder::new("file");
        b.leaf("C", "! note").text("\n").leaf("a-stmt", "X=1").text("\n");
        let mut tree = b.build();
        let before = tree.to_source();

        let mut config = Config::default();
        config.passes.remove_comments = true;
        config.spacing.after_progunit = crate::format::Spacing::Count(0);
        assert!(normalize(&mut tree, &config).is_err());
        assert_eq!(tree.to_source(), before);
    }

    #[test]
    fn test_everything_disabled_is_a_noop() {
        let mut config = Config::default();
        config.passes.spacing = false;
        config.passes.indent = false;
        config.passes.continuation = false;
        config.spacing = SpacingRules::keep_all();

        let mut b = TreeBuilder::new("file");
        b.start("if-construct")
            .start("if-block")
            .leaf("if-then-stmt", "if(a)then")
            .text("\n\t    ")
            .leaf("a-stmt", "x  =  1")
            .text("   \n")
            .leaf("end-if-stmt", "endif")
            .finish()
            .finish();
        let mut tree = b.build();
        let before = tree.to_source();
        let report = normalize(&mut tree, &config).unwrap();
        assert_eq!(report, NormalizeReport::default());
        assert_eq!(tree.to_source(), before);
    }
}
