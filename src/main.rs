//! ftidy - Cosmetic and structural normalizer for Fortran concrete syntax trees

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use ftidy::process::{format_cst, Emit};
use ftidy::{parse_args, CliArgs, Config, Result};
use glob::Pattern;
use rayon::prelude::*;
use walkdir::WalkDir;

/// CST file extensions to process
const CST_EXTENSIONS: &[&str] = &["json", "JSON"];

/// Default maximum file size in bytes (100 MB)
/// Files larger than this are skipped to prevent memory exhaustion
const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = parse_args();
    init_tracing(args.debug);

    // Check if we should read from stdin
    let use_stdin =
        args.inputs.is_empty() || (args.inputs.len() == 1 && args.inputs[0].as_os_str() == "-");

    // If no inputs and running interactively, print usage; otherwise read from stdin
    if args.inputs.is_empty() && io::stdin().is_terminal() {
        ftidy::build_cli().print_help()?;
        return Ok(());
    }

    if use_stdin {
        // Process stdin - use current directory for config discovery
        let config = build_config(&args, None)?;
        return process_stdin(&config, &args);
    }

    // For explicit config files, we use one config for all files
    // For auto-discovery, each file may have its own config
    let base_config = if args.config.is_some() {
        Some(build_config(&args, None)?)
    } else {
        None
    };

    // Configure thread pool if --jobs specified
    if let Some(jobs) = args.jobs {
        if jobs > 0 {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
            {
                tracing::warn!("failed to configure thread pool: {e}");
            }
        }
    }

    let files = collect_files(&args);

    if files.is_empty() {
        if !args.silent {
            eprintln!("No CST files found to normalize.");
        }
        return Ok(());
    }

    let errors = if args.stdout || args.jobs == Some(1) {
        // Sequential processing keeps stdout output in input order
        process_files_sequential(&files, base_config.as_ref(), &args)
    } else {
        process_files_parallel(&files, base_config.as_ref(), &args)
    };

    if errors > 0 {
        anyhow::bail!("{errors} file(s) could not be normalized");
    }
    Ok(())
}

/// Install the log subscriber; `RUST_LOG` wins over `--debug`
fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "ftidy=debug" } else { "warn" })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

/// Build configuration from CLI args and optional config file
///
/// If no explicit config file is given, config files are discovered from
/// `for_path` (or the current directory). CLI flags override file values.
fn build_config(args: &CliArgs, for_path: Option<&Path>) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("using config file {}", config_path.display());
        Config::from_toml_file(config_path)?
    } else {
        let start = match for_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let discovered = Config::discover_config_files(&start);
        tracing::debug!(?discovered, "config files for {}", start.display());
        Config::from_files(&discovered)?
    };

    args.apply_to(&mut config);
    config.validate()?;
    tracing::debug!(?config, "configuration");
    Ok(config)
}

fn collect_files(args: &CliArgs) -> Vec<PathBuf> {
    // Compile exclude patterns
    let exclude_patterns: Vec<Pattern> = args
        .exclude
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!("ignoring exclude pattern {p:?}: {e}");
                None
            }
        })
        .collect();

    let mut files = Vec::new();

    for input in &args.inputs {
        if input.is_file() {
            if !is_excluded(input, &exclude_patterns) {
                files.push(input.clone());
            }
        } else if input.is_dir() {
            let max_depth = if args.recursive { 256 } else { 1 };
            // WalkDir reports symlink loops as errors; they are skipped
            for entry in WalkDir::new(input)
                .follow_links(true)
                .max_depth(max_depth)
                .into_iter()
                .filter_map(std::result::Result::ok)
            {
                let path = entry.path();
                if path.is_file()
                    && is_cst_file(path, &args.extensions)
                    && !is_excluded(path, &exclude_patterns)
                {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            tracing::warn!("no such file or directory: {}", input.display());
        }
    }

    files
}

/// Check if a path matches any exclusion pattern
fn is_excluded(path: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }

    let path_str = path.to_string_lossy();

    patterns.iter().any(|pattern| {
        // Full path, file name, then each component (for directory patterns)
        pattern.matches(&path_str)
            || path
                .file_name()
                .is_some_and(|name| pattern.matches(&name.to_string_lossy()))
            || path.components().any(|component| match component {
                std::path::Component::Normal(c) => pattern.matches(&c.to_string_lossy()),
                _ => false,
            })
    })
}

/// Check if a file has a CST extension
/// Checks against both default extensions and any custom extensions provided
fn is_cst_file(path: &Path, custom_extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            CST_EXTENSIONS.contains(&ext)
                || custom_extensions
                    .iter()
                    .any(|custom| custom.strip_prefix('.').unwrap_or(custom) == ext)
        })
}

fn config_for(path: &Path, base_config: Option<&Config>, args: &CliArgs) -> Result<Config> {
    match base_config {
        Some(config) => Ok(config.clone()),
        None => build_config(args, Some(path)),
    }
}

/// Process files sequentially (for stdout output); returns the error count
fn process_files_sequential(files: &[PathBuf], base_config: Option<&Config>, args: &CliArgs) -> usize {
    let mut errors = 0;
    for path in files {
        let file_result =
            config_for(path, base_config, args).and_then(|config| process_single_file(path, &config, args));
        if let Err(e) = file_result {
            errors += 1;
            eprintln!("Error normalizing {}: {e:#}", path.display());
        }
    }
    errors
}

/// Process files in parallel using Rayon; returns the error count
fn process_files_parallel(files: &[PathBuf], base_config: Option<&Config>, args: &CliArgs) -> usize {
    let success_count = AtomicUsize::new(0);
    let error_count = AtomicUsize::new(0);

    files.par_iter().for_each(|path| {
        let file_result =
            config_for(path, base_config, args).and_then(|config| process_single_file(path, &config, args));

        match file_result {
            Ok(()) => {
                success_count.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error_count.fetch_add(1, Ordering::Relaxed);
                eprintln!("Error normalizing {}: {e:#}", path.display());
            }
        }
    });

    let success = success_count.load(Ordering::Relaxed);
    let errors = error_count.load(Ordering::Relaxed);

    if !args.silent {
        if errors == 0 {
            eprintln!("Normalized {success} files successfully.");
        } else {
            eprintln!("Normalized {success} files, {errors} errors.");
        }
    }
    errors
}

/// Where the in-place output of `path` goes
///
/// JSON output replaces the input; Fortran output is written next to it.
fn output_path(path: &Path, emit: Emit) -> PathBuf {
    match emit {
        Emit::Json => path.to_path_buf(),
        Emit::Fortran => path.with_extension("F90"),
    }
}

/// Process a single file
fn process_single_file(path: &Path, config: &Config, args: &CliArgs) -> Result<()> {
    // Check file size BEFORE reading to prevent memory exhaustion
    let file_size = std::fs::metadata(path)?.len();
    if file_size > DEFAULT_MAX_FILE_SIZE {
        if !args.silent {
            eprintln!(
                "Skipping {} ({} MB exceeds limit of {} MB)",
                path.display(),
                file_size / (1024 * 1024),
                DEFAULT_MAX_FILE_SIZE / (1024 * 1024)
            );
        }
        return Ok(());
    }

    if !args.silent && !args.stdout {
        eprintln!("Normalizing: {}", path.display());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut output = Vec::new();
    let report = format_cst(reader, &mut output, config, args.emit)
        .with_context(|| format!("while normalizing {}", path.display()))?;
    tracing::debug!(?report, "normalized {}", path.display());

    if args.stdout {
        io::stdout().lock().write_all(&output)?;
    } else {
        std::fs::write(output_path(path, args.emit), &output)?;
    }

    Ok(())
}

/// Process input from stdin, output to stdout
fn process_stdin(config: &Config, args: &CliArgs) -> Result<()> {
    let mut stdin_contents = Vec::new();
    io::stdin()
        .take(DEFAULT_MAX_FILE_SIZE + 1)
        .read_to_end(&mut stdin_contents)?;

    #[allow(clippy::cast_possible_truncation)]
    let stdin_size = stdin_contents.len() as u64;
    if stdin_size > DEFAULT_MAX_FILE_SIZE {
        anyhow::bail!(
            "stdin input too large (exceeds limit of {} MB)",
            DEFAULT_MAX_FILE_SIZE / (1024 * 1024)
        );
    }

    let mut output = Vec::new();
    format_cst(stdin_contents.as_slice(), &mut output, config, args.emit)?;
    io::stdout().write_all(&output)?;

    if !args.silent {
        eprintln!("Normalized stdin successfully.");
    }

    Ok(())
}
