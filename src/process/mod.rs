//! Tree processing pipeline.
//!
//! This module orders the passes of [`crate::format`] on one tree:
//!
//! **Structural edits** (each optional):
//! - Remove comments, convert one-line IF statements
//! - Drop empty CONTAINS sections and blank lines
//!
//! **Cosmetic passes:**
//! - Spacing rules, then construct-aware indentation
//! - Continuation markers, aligned last on the final text
//! - Case folding
//!
//! The main entry points are [`normalize`], working on a [`crate::tree::Tree`],
//! and [`format_cst`] which reads the parser's JSON output and writes
//! Fortran source or JSON to any `Write` implementation.

pub mod pipeline;

pub use pipeline::{format_cst, normalize, Emit, NormalizeReport};
