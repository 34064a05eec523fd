//! Command-line interface for ftidy.
//!
//! Defines CLI arguments using clap builder API

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgGroup, Command};

use crate::config::Config;
use crate::format::CaseMode;
use crate::process::Emit;

/// CLI arguments parsed from command line
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// CST files or directories to normalize
    pub inputs: Vec<PathBuf>,

    /// Config file path (disables auto-discovery)
    pub config: Option<PathBuf>,

    /// Output format
    pub emit: Emit,

    /// Output to stdout instead of in-place
    pub stdout: bool,

    /// Recursive directory processing
    pub recursive: bool,

    /// Exclude patterns for files/directories (glob patterns)
    pub exclude: Vec<String>,

    /// Custom CST file extensions (in addition to `json`)
    pub extensions: Vec<String>,

    /// Number of parallel jobs (0 = auto, 1 = sequential)
    pub jobs: Option<usize>,

    /// Silent mode (no output)
    pub silent: bool,

    /// Enable debug output
    pub debug: bool,

    // Pass toggles; unset flags keep the file value
    pub remove_comments: bool,
    pub convert_if: bool,
    pub remove_empty_contains: bool,
    pub remove_empty_lines: bool,
    pub no_spacing: bool,
    pub no_indent: bool,
    pub no_continuation: bool,
    pub case: Option<CaseMode>,

    /// Indent added inside branches and constructs
    pub indent_branch: Option<usize>,
    /// Indent added inside program units
    pub indent_unit: Option<usize>,

    /// Do not align continued lines
    pub no_align: bool,
    /// Remove every continuation marker
    pub remove_all_cnt: bool,
    /// Remove markers at the beginning of continued lines
    pub remove_begin_cnt: bool,
    /// Do not add missing markers at the beginning of continued lines
    pub no_add_begin: bool,
}

impl CliArgs {
    /// Apply command-line overrides on top of a file configuration
    pub fn apply_to(&self, config: &mut Config) {
        let passes = &mut config.passes;
        passes.remove_comments |= self.remove_comments;
        passes.convert_if_statements |= self.convert_if;
        passes.remove_empty_contains |= self.remove_empty_contains;
        passes.remove_empty_lines |= self.remove_empty_lines;
        if self.no_spacing {
            passes.spacing = false;
        }
        if self.no_indent {
            passes.indent = false;
        }
        if self.no_continuation {
            passes.continuation = false;
        }
        if let Some(case) = self.case {
            passes.case = case;
        }

        if let Some(branch) = self.indent_branch {
            config.indent.branch = branch;
        }
        if let Some(unit) = self.indent_unit {
            config.indent.program_unit = unit;
        }

        let continuation = &mut config.continuation;
        if self.no_align {
            continuation.align = false;
        }
        if self.no_add_begin {
            continuation.add_begin = false;
        }
        // Removal modes switch off the modes they cannot be combined with
        if self.remove_all_cnt {
            continuation.remove_all = true;
            continuation.align = false;
            continuation.add_begin = false;
        }
        if self.remove_begin_cnt {
            continuation.remove_begin = true;
            continuation.add_begin = false;
        }
    }
}

/// Build the clap Command for parsing CLI arguments
#[must_use]
pub fn build_cli() -> Command {
    Command::new("ftidy")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Cosmetic and structural normalizer for Fortran concrete syntax trees")
        .arg(
            Arg::new("inputs")
                .help("CST files (JSON) or directories to normalize; '-' reads stdin")
                .value_name("FILE")
                .num_args(1..)
                .required(false)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file path (overrides auto-discovery)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .help("Output format [default: fortran]")
                .value_name("FORMAT")
                .value_parser(["fortran", "json"]),
        )
        .arg(
            Arg::new("stdout")
                .short('s')
                .long("stdout")
                .help("Output to stdout instead of writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("recursive")
                .short('r')
                .long("recursive")
                .help("Process directories recursively")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclude")
                .short('e')
                .long("exclude")
                .help("Exclude files/directories matching glob pattern (repeatable)")
                .value_name("PATTERN")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("extension")
                .short('x')
                .long("extension")
                .help("Additional CST file extension (repeatable)")
                .value_name("EXT")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help("Number of parallel jobs (0=auto, 1=sequential)")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .help("Enable debug output (RUST_LOG takes precedence)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('S')
                .long("silent")
                .help("Silent mode (no progress output)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("remove-comments")
                .long("remove-comments")
                .help("Remove comments (directive-like comments are kept)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("convert-if")
                .long("convert-if")
                .help("Convert one-line IF statements into IF constructs")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("remove-empty-contains")
                .long("remove-empty-contains")
                .help("Remove CONTAINS statements with nothing after them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("remove-empty-lines")
                .long("remove-empty-lines")
                .help("Remove blank lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-spacing")
                .long("no-spacing")
                .help("Disable spacing rules")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-indent")
                .long("no-indent")
                .help("Disable indentation")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-continuation")
                .long("no-continuation")
                .help("Leave continuation markers alone")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("upper-case")
                .long("upper-case")
                .help("Upper-case code text")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("lower-case")
                .long("lower-case")
                .help("Lower-case code text")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("case")
                .args(["upper-case", "lower-case"])
                .multiple(false),
        )
        .arg(
            Arg::new("indent-branch")
                .short('i')
                .long("indent-branch")
                .help("Indent inside branches and constructs [default: 2]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("indent-unit")
                .long("indent-unit")
                .help("Indent inside program units [default: 0]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("no-align")
                .long("no-align")
                .help("Do not align continued lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-add-begin")
                .long("no-add-begin")
                .help("Do not add '&' at the beginning of continued lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("remove-all-cnt")
                .long("remove-all-cnt")
                .help("Remove every '&' and join continued lines (implies --no-align)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("remove-begin-cnt")
                .long("remove-begin-cnt")
                .help("Remove '&' at the beginning of continued lines")
                .action(ArgAction::SetTrue),
        )
}

/// Parse CLI arguments from command line
#[must_use]
pub fn parse_args() -> CliArgs {
    args_from_matches(&build_cli().get_matches())
}

/// Parse CLI arguments from an iterator (for testing)
#[must_use]
pub fn parse_args_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    args_from_matches(&build_cli().get_matches_from(args))
}

/// Parse CLI arguments from an iterator, reporting usage errors
pub fn try_parse_args_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Ok(args_from_matches(&build_cli().try_get_matches_from(args)?))
}

/// Convert clap `ArgMatches` to `CliArgs`
fn args_from_matches(matches: &clap::ArgMatches) -> CliArgs {
    let case = if matches.get_flag("upper-case") {
        Some(CaseMode::Upper)
    } else if matches.get_flag("lower-case") {
        Some(CaseMode::Lower)
    } else {
        None
    };
    let emit = match matches.get_one::<String>("emit").map(String::as_str) {
        Some("json") => Emit::Json,
        _ => Emit::Fortran,
    };

    CliArgs {
        inputs: matches
            .get_many::<PathBuf>("inputs")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        emit,
        stdout: matches.get_flag("stdout"),
        recursive: matches.get_flag("recursive"),
        exclude: matches
            .get_many::<String>("exclude")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        extensions: matches
            .get_many::<String>("extension")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        jobs: matches.get_one::<usize>("jobs").copied(),
        silent: matches.get_flag("silent"),
        debug: matches.get_flag("debug"),
        remove_comments: matches.get_flag("remove-comments"),
        convert_if: matches.get_flag("convert-if"),
        remove_empty_contains: matches.get_flag("remove-empty-contains"),
        remove_empty_lines: matches.get_flag("remove-empty-lines"),
        no_spacing: matches.get_flag("no-spacing"),
        no_indent: matches.get_flag("no-indent"),
        no_continuation: matches.get_flag("no-continuation"),
        case,
        indent_branch: matches.get_one::<usize>("indent-branch").copied(),
        indent_unit: matches.get_one::<usize>("indent-unit").copied(),
        no_align: matches.get_flag("no-align"),
        remove_all_cnt: matches.get_flag("remove-all-cnt"),
        remove_begin_cnt: matches.get_flag("remove-begin-cnt"),
        no_add_begin: matches.get_flag("no-add-begin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_builds() {
        let cmd = build_cli();
        assert_eq!(cmd.get_name(), "ftidy");
        cmd.debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let args = parse_args_from(vec!["ftidy", "tree.json"]);
        assert_eq!(args.inputs, vec![PathBuf::from("tree.json")]);
        assert_eq!(args.emit, Emit::Fortran);
        assert!(!args.stdout);
        assert!(!args.no_indent);
        assert_eq!(args.case, None);
        assert_eq!(args.indent_branch, None);
    }

    #[test]
    fn test_pass_flags_override_config() {
        let args = parse_args_from(vec![
            "ftidy",
            "--remove-comments",
            "--no-indent",
            "--upper-case",
            "-i",
            "4",
            "tree.json",
        ]);
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert!(config.passes.remove_comments);
        assert!(!config.passes.indent);
        assert!(config.passes.spacing);
        assert_eq!(config.passes.case, CaseMode::Upper);
        assert_eq!(config.indent.branch, 4);
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let mut config = Config::default();
        config.passes.remove_empty_lines = true;
        config.indent.program_unit = 3;
        parse_args_from(vec!["ftidy", "tree.json"]).apply_to(&mut config);
        assert!(config.passes.remove_empty_lines);
        assert_eq!(config.indent.program_unit, 3);
    }

    #[test]
    fn test_remove_all_cnt_is_valid_alone() {
        let args = parse_args_from(vec!["ftidy", "--remove-all-cnt", "tree.json"]);
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert!(config.continuation.remove_all);
        assert!(!config.continuation.align);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_case_flags_conflict() {
        let result = try_parse_args_from(vec!["ftidy", "--upper-case", "--lower-case", "t.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_exclude_and_extensions() {
        let args = parse_args_from(vec![
            "ftidy", "-r", "-e", "build*", "--exclude", "*.tmp.json", "-x", "cst", "src/",
        ]);
        assert_eq!(args.exclude, vec!["build*", "*.tmp.json"]);
        assert_eq!(args.extensions, vec!["cst"]);
        assert!(args.recursive);
    }

    #[test]
    fn test_emit_json() {
        let args = parse_args_from(vec!["ftidy", "--emit", "json", "-s", "tree.json"]);
        assert_eq!(args.emit, Emit::Json);
        assert!(args.stdout);
    }
}
