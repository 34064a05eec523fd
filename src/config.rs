//! Configuration management for ftidy.
//!
//! This module provides the [`Config`] struct which controls every pass.
//! Configuration can be loaded from:
//! - TOML files (`ftidy.toml`)
//! - CLI arguments (which override file settings)
//!
//! Config files are auto-discovered in the user's home directory and in every
//! directory from the filesystem root down to the file being normalized.
//! Files are merged table by table: a later file only overrides the keys it
//! sets, including keys nested in `[spacing.adjacent_keywords]`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{NormalizeError, Result};
use crate::format::{CaseMode, CommentOptions, ContinuationOptions, IndentParams, SpacingRules};

/// Config file names to search for (in order of priority, later overrides earlier)
const CONFIG_FILE_NAMES: &[&str] = &["ftidy.toml"];

/// Get the user's home directory
fn dirs_home() -> Option<PathBuf> {
    // Try HOME environment variable first (works on Unix and some Windows setups)
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home));
    }
    // Fallback for Windows
    if let Ok(userprofile) = std::env::var("USERPROFILE") {
        return Some(PathBuf::from(userprofile));
    }
    None
}

/// Which passes run, and the case folding applied last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Passes {
    pub remove_comments: bool,
    /// Turn one-line IF statements into IF constructs
    pub convert_if_statements: bool,
    pub remove_empty_contains: bool,
    pub remove_empty_lines: bool,
    pub spacing: bool,
    pub indent: bool,
    pub continuation: bool,
    pub case: CaseMode,
}

impl Default for Passes {
    fn default() -> Self {
        Self {
            remove_comments: false,
            convert_if_statements: false,
            remove_empty_contains: false,
            remove_empty_lines: false,
            spacing: true,
            indent: true,
            continuation: true,
            case: CaseMode::NoChange,
        }
    }
}

/// Main configuration struct for ftidy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub passes: Passes,
    pub indent: IndentParams,
    pub comments: CommentOptions,
    pub continuation: ContinuationOptions,
    pub spacing: SpacingRules,
}

impl Config {
    /// Check every option before any pass runs
    ///
    /// Options of disabled passes are checked too: a configuration file
    /// with an impossible value is wrong whether or not it is used today.
    pub fn validate(&self) -> std::result::Result<(), NormalizeError> {
        self.continuation.validate()?;
        self.spacing.validate()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Discover config files from parent directories of a given path
    ///
    /// Searches from the root down to the file's directory, after the home directory config.
    /// Returns list of config file paths in order of priority (least specific first).
    #[must_use]
    pub fn discover_config_files(start_path: &Path) -> Vec<PathBuf> {
        let mut config_files = Vec::new();

        // Add home directory config first (lowest priority)
        if let Some(home) = dirs_home() {
            for config_name in CONFIG_FILE_NAMES {
                let home_config = home.join(config_name);
                if home_config.is_file() {
                    config_files.push(home_config);
                }
            }
        }

        // Start from the file's parent directory (or the path itself if it's a directory)
        let start_dir = if start_path.is_file() {
            start_path.parent().map(Path::to_path_buf)
        } else if start_path.is_dir() {
            Some(start_path.to_path_buf())
        } else {
            // Path doesn't exist, use current directory
            std::env::current_dir().ok()
        };

        // Collect config files from parent directories (from root to current)
        if let Some(dir) = start_dir {
            let mut ancestors: Vec<PathBuf> = dir.ancestors().map(Path::to_path_buf).collect();
            // Reverse so we go from root to current (less specific to more specific)
            ancestors.reverse();

            for ancestor in ancestors {
                for config_name in CONFIG_FILE_NAMES {
                    let config_path = ancestor.join(config_name);
                    if config_path.is_file() && !config_files.contains(&config_path) {
                        config_files.push(config_path);
                    }
                }
            }
        }

        config_files
    }

    /// Load and merge configuration from discovered config files
    ///
    /// Later files override earlier ones (only explicitly set keys).
    /// Unreadable files are skipped with a warning; a merged configuration
    /// with a wrongly typed value is an error.
    pub fn from_discovered_files(start_path: &Path) -> Result<Self> {
        Self::from_files(&Self::discover_config_files(start_path))
    }

    /// Merge the given files in order
    pub fn from_files(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            let table = std::fs::read_to_string(path)
                .map_err(anyhow::Error::from)
                .and_then(|contents| Ok(contents.parse::<toml::Table>()?));
            match table {
                Ok(table) => merge_tables(&mut merged, table),
                Err(e) => tracing::warn!("failed to load {}: {e}", path.display()),
            }
        }
        toml::Value::Table(merged)
            .try_into()
            .context("invalid merged configuration")
    }
}

/// Deep merge of `overlay` into `base`: nested tables merge key by key
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) =
            (base.get_mut(&key), &value)
        {
            merge_tables(existing, incoming.clone());
            continue;
        }
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Spacing;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.passes.indent);
        assert!(!config.passes.remove_comments);
        assert_eq!(config.indent.branch, 2);
        assert_eq!(config.indent.program_unit, 0);
        assert_eq!(config.spacing.after_comma, Spacing::Count(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
[passes]
remove_comments = true
case = "upper"

[indent]
branch = 3

[spacing]
after_comma = "keep"
before_op = 0

[spacing.adjacent_keywords]
end_do = 0
"#,
        )
        .unwrap();
        assert!(config.passes.remove_comments);
        assert!(config.passes.spacing);
        assert_eq!(config.passes.case, CaseMode::Upper);
        assert_eq!(config.indent.branch, 3);
        assert_eq!(config.indent.excluded_directives, vec!["!$OMP".to_string()]);
        assert_eq!(config.spacing.after_comma, Spacing::Keep);
        assert_eq!(config.spacing.before_op, Spacing::Count(0));
        assert!(config.spacing.adjacent_keywords.enabled);
        assert_eq!(
            config.spacing.adjacent_keywords.overrides.get("end_do"),
            Some(&Spacing::Count(0))
        );
    }

    #[test]
    fn test_validate_reports_usage_errors() {
        let config = Config::from_toml_str("[spacing]\nafter_type_decl = 0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(NormalizeError::SpacingTooSmall { .. })
        ));

        let config = Config::from_toml_str("[continuation]\nremove_all = true").unwrap();
        assert!(matches!(
            config.validate(),
            Err(NormalizeError::ConflictingModes { .. })
        ));

        let config =
            Config::from_toml_str("[spacing.adjacent_keywords]\nimplicit_none = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_misspelled_keys_are_rejected() {
        let err = Config::from_toml_str("[spacing]\nbefor_op = 2\n").unwrap_err();
        assert!(format!("{err:#}").contains("befor_op"));
        assert!(Config::from_toml_str("[passes]\nremove_coments = true\n").is_err());
        assert!(Config::from_toml_str("[indnet]\nbranch = 3\n").is_err());
        assert!(Config::from_toml_str("[continuation]\nalign_all = true\n").is_err());
        assert!(Config::from_toml_str("[comments]\nexcluded = []\n").is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ftidy.toml");
        std::fs::write(&path, "[indent]\nbranchh = 3\n").unwrap();
        assert!(Config::from_files(&[path]).is_err());
    }

    #[test]
    fn test_merge_tables_is_deep() {
        let mut base: toml::Table = "[indent]\nbranch = 4\nprogram_unit = 1".parse().unwrap();
        let overlay: toml::Table = "[indent]\nprogram_unit = 2".parse().unwrap();
        merge_tables(&mut base, overlay);
        let config: Config = toml::Value::Table(base).try_into().unwrap();
        assert_eq!(config.indent.branch, 4);
        assert_eq!(config.indent.program_unit, 2);
    }

    #[test]
    fn test_discovered_files_merge_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("src");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(
            dir.path().join("ftidy.toml"),
            "[indent]\nbranch = 4\n[spacing]\nafter_comma = 0\n",
        )
        .unwrap();
        std::fs::write(sub.join("ftidy.toml"), "[spacing]\nafter_comma = \"keep\"\n").unwrap();

        let found = Config::discover_config_files(&sub);
        let outer = found.iter().position(|p| p == &dir.path().join("ftidy.toml"));
        let inner = found.iter().position(|p| p == &sub.join("ftidy.toml"));
        assert!(outer.unwrap() < inner.unwrap());

        let config = Config::from_files(&[dir.path().join("ftidy.toml"), sub.join("ftidy.toml")])
            .unwrap();
        assert_eq!(config.indent.branch, 4);
        assert_eq!(config.spacing.after_comma, Spacing::Keep);
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[indent\nbranch = ").unwrap();
        let config = Config::from_files(&[broken]).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ftidy.toml");
        std::fs::write(&path, "[indent]\nbranch = \"wide\"\n").unwrap();
        assert!(Config::from_files(&[path.clone()]).is_err());
        assert!(Config::from_toml_file(&path).is_err());
    }
}
