use crate::classifier::BinaryClassifier;
use crate::cli::{Args, Mode};
use crate::committer::{self, VersionControl};
use crate::config::{ConfigLoader, FlagConfig};
use crate::errors::{Error, Result};
use crate::output_formatter::{OutputFormatter, display_path};
use crate::patterns::FlagPattern;
use crate::replacer::Replacer;
use crate::scanner::Scanner;
use crate::walker::TreeWalker;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a completed run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub root: PathBuf,
    pub files_matched: usize,
    pub occurrences: usize,
    /// Files rewritten on disk, in scan order.
    pub modified: Vec<PathBuf>,
    /// Files that matched but could not be rewritten.
    pub failed: Vec<PathBuf>,
    /// Output of the version-control tool, when a commit was created.
    pub commit: Option<String>,
}

/// Picks the directory to scan.
///
/// An explicit root wins. Otherwise the enclosing git work tree of the current
/// directory is used, falling back to the current directory itself.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let candidate = match explicit {
        Some(root) => root.to_path_buf(),
        None => {
            let cwd = env::current_dir()?;
            committer::discover_repo_root(&cwd).unwrap_or(cwd)
        }
    };

    if !candidate.is_dir() {
        return Err(Error::InvalidRoot(candidate));
    }

    Ok(candidate.canonicalize()?)
}

/// Loads the configuration named on the command line, or the built-in defaults.
pub fn load_config(explicit: Option<&Path>, root: &Path) -> Result<FlagConfig> {
    match explicit {
        Some(path) => {
            let resolved = ConfigLoader::find_config(path, root)?;
            info!("Using config file: {}", resolved.display());
            ConfigLoader::load(&resolved)
        }
        None => FlagConfig::default().validate(),
    }
}

/// Runs the whole scan / apply / commit sequence.
///
/// The report is written to `out`. `make_vcs` is only called in commit mode
/// and only once there is something to commit.
pub fn run<W, F>(args: &Args, out: W, make_vcs: F) -> Result<RunSummary>
where
    W: Write,
    F: FnOnce(&Path) -> Box<dyn VersionControl>,
{
    let root = resolve_root(args.root.as_deref())?;
    let config = load_config(args.config.as_deref(), &root)?;
    let mode = args.mode();
    let mut output = OutputFormatter::new(out, args.format);

    let pattern = FlagPattern::from_config(&config)?;
    let scanner = Scanner::new(pattern.clone(), BinaryClassifier::from_config(&config))
        .with_progress(args.progress);
    let walker = TreeWalker::new(&root, config.skip_dirs.clone())
        .respect_gitignore(args.respect_gitignore);

    output.status(format!("Scanning {} for '{}'...", root.display(), config.bad_flag))?;
    output.status("")?;

    let report = scanner.scan_tree(&walker);
    output.write_report(&report, &config.bad_flag)?;

    let mut summary = RunSummary {
        root: root.clone(),
        files_matched: report.files.len(),
        occurrences: report.total_occurrences(),
        ..RunSummary::default()
    };

    if report.is_empty() {
        return Ok(summary);
    }

    if !mode.writes() {
        output.status("Dry-run mode: no changes made. Use --apply to apply changes.")?;
        return Ok(summary);
    }

    output.status("Applying changes...")?;
    let replaced = Replacer::new(pattern).apply(&report);
    for path in &replaced.modified {
        output.status(format!("  Modified: {}", display_path(report.relative(path))))?;
    }
    summary.modified = replaced.modified;
    summary.failed = replaced.failed.into_iter().map(|(path, _)| path).collect();

    if !summary.failed.is_empty() {
        output.status(format!(
            "  Failed to modify {} file(s); see errors above.",
            summary.failed.len()
        ))?;
    }

    if summary.modified.is_empty() {
        output.status("No files were modified.")?;
        return Ok(summary);
    }

    output.status("")?;
    output.status(format!("Modified {} file(s).", summary.modified.len()))?;

    if mode == Mode::Commit {
        output.status("")?;
        output.status("Committing changes...")?;

        let message = config.commit_message();
        let vcs = make_vcs(&root);
        summary.commit = committer::commit_changes(vcs.as_ref(), &summary.modified, &message)?;

        output.status(format!("Committed: {message}"))?;
        if let Some(stdout) = &summary.commit {
            output.status(stdout.trim_end())?;
        }
    }

    output.status("Done.")?;
    Ok(summary)
}
