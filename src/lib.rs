//! ftidy - Cosmetic and structural normalizer for Fortran concrete syntax trees
//!
//! Works on the element tree produced by an external Fortran parser: spacing,
//! indentation, continuation markers and case, plus a few structural edits.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]

pub mod cli;
pub mod config;
pub mod error;
pub mod expr;
pub mod format;
pub mod process;
pub mod tree;

// Re-export commonly used types
pub use cli::{build_cli, parse_args, parse_args_from, CliArgs};
pub use config::Config;
pub use error::{NormalizeError, Result};
pub use process::{format_cst, normalize, Emit, NormalizeReport};
pub use tree::{NodeId, NodeKind, RawNode, Tree, TreeBuilder};
