//! HTTP Double - CLI Entry Point
//!
//! Validates expectation files and compares JSON documents the same way
//! simulated clients compare request bodies.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use http_double::compare::{ArrayComparison, NameComparison, NullComparison, ValueComparison};
use http_double::{ComparisonOptions, MockConfig, ValueComparator};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "http-double",
    about = "Simulated HTTP clients for tests - expectation files and semantic JSON comparison",
    version
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info", global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an expectation file and exit
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "http-double.yaml")]
        config: PathBuf,
    },

    /// Print a sample configuration and exit
    PrintConfig,

    /// Compare two JSON files and list their differences
    Compare(CompareArgs),
}

#[derive(ClapArgs, Debug)]
struct CompareArgs {
    /// Expected document
    expected: PathBuf,

    /// Actual document
    actual: PathBuf,

    /// Compare leaf values by their raw text
    #[arg(long)]
    exact_values: bool,

    /// Treat an expected null and a missing property as different
    #[arg(long)]
    exact_nulls: bool,

    /// Match property names case-insensitively
    #[arg(long)]
    ignore_case: bool,

    /// Report a differing array as a single replacement
    #[arg(long)]
    replace_arrays: bool,

    /// Path to skip, e.g. `$.meta.*` (repeatable)
    #[arg(long = "ignore", value_name = "PATH")]
    ignored: Vec<String>,

    /// Stop after this many differences (0 = unlimited)
    #[arg(long, default_value_t = 20)]
    max_differences: usize,
}

impl CompareArgs {
    fn options(&self) -> ComparisonOptions {
        let mut options = ComparisonOptions::default().with_max_differences(self.max_differences);
        if self.exact_values {
            options = options.with_values(ValueComparison::Exact);
        }
        if self.exact_nulls {
            options = options.with_nulls(NullComparison::Exact);
        }
        if self.ignore_case {
            options = options.with_property_names(NameComparison::CaseInsensitive);
        }
        if self.replace_arrays {
            options = options.with_arrays(ArrayComparison::ReplaceWhole);
        }
        for path in &self.ignored {
            options = options.ignoring(path.clone());
        }
        options
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::PrintConfig => {
            println!("{}", include_str!("../demos/http-double.yaml"));
            Ok(())
        }
        Command::Validate { config } => validate(&config),
        Command::Compare(compare_args) => compare(&compare_args),
    }
}

fn validate(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {:?}", path);
    }
    info!(path = ?path, "Loading configuration");
    let config = MockConfig::from_file(path)?;
    println!(
        "Configuration is valid ({} clients, {} expectations defined)",
        config.clients.len(),
        config.expectation_count()
    );
    Ok(())
}

fn compare(args: &CompareArgs) -> Result<()> {
    let options = args.options();
    options.validate()?;

    let expected = std::fs::read(&args.expected)
        .with_context(|| format!("Failed to read {}", args.expected.display()))?;
    let actual = std::fs::read(&args.actual)
        .with_context(|| format!("Failed to read {}", args.actual.display()))?;

    let result = ValueComparator::new(options).compare_slices(&expected, &actual)?;
    if !result.is_equal() {
        anyhow::bail!(
            "{} and {} differ\n{}",
            args.expected.display(),
            args.actual.display(),
            result.to_string().trim_end()
        );
    }
    println!("{}", result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn json_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn compare_args(expected: &Path, actual: &Path) -> CompareArgs {
        CompareArgs {
            expected: expected.to_path_buf(),
            actual: actual.to_path_buf(),
            exact_values: false,
            exact_nulls: false,
            ignore_case: false,
            replace_arrays: false,
            ignored: Vec::new(),
            max_differences: 20,
        }
    }

    #[test]
    fn test_compare_equivalent_documents() {
        let expected = json_file(r#"{"a": 1, "b": null}"#);
        let actual = json_file(r#"{"a":1}"#);
        assert!(compare(&compare_args(expected.path(), actual.path())).is_ok());
    }

    #[test]
    fn test_compare_reports_differences_as_error() {
        let expected = json_file(r#"{"a": 1, "b": null}"#);
        let actual = json_file(r#"{"a":1}"#);
        let mut args = compare_args(expected.path(), actual.path());
        args.exact_nulls = true;

        let err = compare(&args).unwrap_err().to_string();
        assert!(err.contains("differ"), "{}", err);
        assert!(err.contains("$.b"), "{}", err);
    }

    #[test]
    fn test_compare_missing_file() {
        let expected = json_file("{}");
        let args = compare_args(expected.path(), Path::new("/nonexistent/actual.json"));
        let err = compare(&args).unwrap_err().to_string();
        assert!(err.contains("Failed to read"), "{}", err);
    }
}
