//! Error types and result aliases for ftidy.
//!
//! This module defines the error handling infrastructure:
//! - [`Result<T>`]: Type alias for `anyhow::Result<T>` used by the pipeline, config loading and the binary
//! - [`NormalizeError`]: the library taxonomy, returned by validators and helpers before any tree is touched

use anyhow::Result as AnyhowResult;
use thiserror::Error;

pub type Result<T> = AnyhowResult<T>;

/// Errors raised by the normalizer itself
///
/// Malformed tree shapes never produce one of these: passes are best-effort
/// on unexpected structure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Two continuation modes that cannot be combined
    #[error("conflicting continuation modes: {first} and {second} cannot be used together")]
    ConflictingModes {
        first: &'static str,
        second: &'static str,
    },

    /// A spacing rule set below its legal minimum
    #[error("{rule} must be at least {min} (is {value})")]
    SpacingTooSmall {
        rule: String,
        min: usize,
        value: usize,
    },

    /// A key outside a fixed keyword table
    #[error("unknown key in {table}: {key}")]
    UnknownKey { table: &'static str, key: String },

    /// Input the helper cannot handle without the external parser
    #[error("unsupported input: {reason}: {text}")]
    Unsupported { reason: &'static str, text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = NormalizeError::ConflictingModes {
            first: "align",
            second: "remove_all",
        };
        assert_eq!(
            err.to_string(),
            "conflicting continuation modes: align and remove_all cannot be used together"
        );

        let err = NormalizeError::SpacingTooSmall {
            rule: "adjacent_keywords.implicit_none".to_string(),
            min: 1,
            value: 0,
        };
        assert_eq!(
            err.to_string(),
            "adjacent_keywords.implicit_none must be at least 1 (is 0)"
        );
    }

    #[test]
    fn test_converts_into_anyhow() {
        fn fails() -> Result<()> {
            Err(NormalizeError::UnknownKey {
                table: "adjacent_keywords",
                key: "end_loop".to_string(),
            })?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("end_loop"));
        assert!(err.downcast_ref::<NormalizeError>().is_some());
    }
}
