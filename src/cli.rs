use crate::output_formatter::OutputFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Replace a deprecated compiler flag across a source tree.
///
/// `flagfix` scans a directory tree for `-Wno-nontrivial-memcall` and rewrites
/// it to `-Wno-nontrivial-memaccess`. Without flags it only reports.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Replace -Wno-nontrivial-memcall with -Wno-nontrivial-memaccess repo-wide",
    long_about = "flagfix - Find and replace a deprecated compiler flag across a source tree.

Binary files (by extension or a NUL byte in the first 8 KiB) are never touched,
and .git, out, node_modules, __pycache__ and .cache directories are skipped.

EXAMPLES:
  flagfix                      # Dry-run: show files that would be changed
  flagfix --apply              # Rewrite the files in place
  flagfix --commit             # Rewrite and commit the result
  flagfix --root third_party/  # Scan somewhere other than the repository root
  flagfix -f json | jq '.files[]'"
)]
pub struct Args {
    /// Apply changes to files (default is dry-run).
    #[arg(long)]
    pub apply: bool,

    /// Apply changes and commit them (implies --apply).
    #[arg(long)]
    pub commit: bool,

    /// Root directory to scan. Defaults to the enclosing git repository, or the
    /// current directory outside of one.
    #[arg(long, env = "FLAGFIX_ROOT")]
    pub root: Option<PathBuf>,

    /// YAML file overriding the flags, skip-set or binary extension list.
    #[arg(short, long, env = "FLAGFIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// The output format for the report.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also skip files excluded by .gitignore and .ignore files.
    #[arg(long)]
    pub respect_gitignore: bool,

    /// Show a progress spinner on stderr while scanning.
    #[arg(long)]
    pub progress: bool,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// What a run is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Scan and report only.
    DryRun,
    /// Scan, report and rewrite.
    Apply,
    /// Rewrite, then stage and commit the rewritten files.
    Commit,
}

impl Mode {
    pub fn writes(self) -> bool {
        !matches!(self, Mode::DryRun)
    }
}

impl Args {
    /// `--commit` implies `--apply`.
    pub fn mode(&self) -> Mode {
        if self.commit {
            Mode::Commit
        } else if self.apply {
            Mode::Apply
        } else {
            Mode::DryRun
        }
    }
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}
