use crate::errors::{Error, Result};
use crate::patterns::FlagPattern;
use crate::scanner::ScanReport;
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error};

/// Rewrites files in place, swapping the bad flag for the good one.
pub struct Replacer {
    pattern: FlagPattern,
}

/// Options for processing a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// If `true`, changes will be calculated but not written to disk.
    pub dry_run: bool,
}

/// The result of processing a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// Number of occurrences replaced.
    pub replacements: usize,
    /// `true` if the content changed (and, unless dry-running, was written).
    pub modified: bool,
}

/// Outcome of applying the replacement to every file of a scan.
#[derive(Debug, Default)]
pub struct ReplaceSummary {
    /// Files actually rewritten, in scan order.
    pub modified: Vec<PathBuf>,
    /// Occurrences replaced across all modified files.
    pub replacements: usize,
    /// Files that could not be read or written.
    pub failed: Vec<(PathBuf, Error)>,
}

impl Replacer {
    pub fn new(pattern: FlagPattern) -> Self {
        Self { pattern }
    }

    /// Processes a single file.
    ///
    /// The file is re-read in full, every literal occurrence of the bad flag is
    /// replaced, and the new content is written atomically only if it differs
    /// from what is on disk. Bytes outside the matches are left untouched.
    pub fn process_file(&self, path: &Path, options: ProcessOptions) -> Result<ProcessResult> {
        let content = fs::read(path)?;
        let replacements = self.pattern.count(&content);

        let new_content = match self.pattern.replace_all(&content) {
            Cow::Owned(new_content) if new_content != content => new_content,
            _ => {
                return Ok(ProcessResult {
                    replacements: 0,
                    modified: false,
                });
            }
        };

        if !options.dry_run {
            write_atomically(path, &new_content)?;
        }

        Ok(ProcessResult {
            replacements,
            modified: true,
        })
    }

    /// Rewrites every file listed in `report`.
    ///
    /// A failure on one file is logged and recorded, then processing moves on to
    /// the next file.
    pub fn apply(&self, report: &ScanReport) -> ReplaceSummary {
        let mut summary = ReplaceSummary::default();
        let options = ProcessOptions::default();

        for file in &report.files {
            match self.process_file(&file.path, options) {
                Ok(result) if result.modified => {
                    debug!(
                        "Rewrote {} ({} replacement(s))",
                        file.path.display(),
                        result.replacements
                    );
                    summary.replacements += result.replacements;
                    summary.modified.push(file.path.clone());
                }
                Ok(_) => debug!("{} no longer contains the flag", file.path.display()),
                Err(e) => {
                    error!("Could not modify {}: {e}", file.path.display());
                    summary.failed.push((file.path.clone(), e));
                }
            }
        }

        summary
    }
}

/// Writes through a temporary file in the same directory, keeping permissions.
///
/// Symlinks are resolved first so the link survives and its target is rewritten.
fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let target = fs::canonicalize(path)?;
    let path = target.as_path();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;

    let perms = fs::metadata(path)?.permissions();
    fs::set_permissions(temp_file.path(), perms)?;

    temp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::BinaryClassifier;
    use crate::config::FlagConfig;
    use crate::scanner::{FileMatches, Scanner};
    use crate::walker::TreeWalker;
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    fn replacer() -> Replacer {
        Replacer::new(FlagPattern::from_config(&FlagConfig::default()).unwrap())
    }

    fn scan(root: &Path) -> ScanReport {
        let config = FlagConfig::default();
        Scanner::new(
            FlagPattern::from_config(&config).unwrap(),
            BinaryClassifier::from_config(&config),
        )
        .scan_tree(&TreeWalker::new(root, config.skip_dirs))
    }

    fn digest(path: &Path) -> Vec<u8> {
        Sha256::digest(fs::read(path).unwrap()).to_vec()
    }

    #[test]
    fn test_rewrites_only_the_flag() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("BUILD.gn");
        fs::write(&path, "a\nflags = [\"-Wno-nontrivial-memcall\"]\nb\n").unwrap();

        let result = replacer()
            .process_file(&path, ProcessOptions::default())
            .unwrap();
        assert_eq!(
            result,
            ProcessResult {
                replacements: 1,
                modified: true
            }
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "a\nflags = [\"-Wno-nontrivial-memaccess\"]\nb\n"
        );
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flags.txt");
        fs::write(&path, "-Wno-nontrivial-memcall").unwrap();
        let before = digest(&path);

        let result = replacer()
            .process_file(&path, ProcessOptions { dry_run: true })
            .unwrap();
        assert!(result.modified);
        assert_eq!(digest(&path), before);
    }

    #[test]
    fn test_non_utf8_bytes_survive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("legacy.mk");
        fs::write(&path, b"\xff\xfeCFLAGS=-Wno-nontrivial-memcall\xc3\n").unwrap();

        replacer()
            .process_file(&path, ProcessOptions::default())
            .unwrap();
        assert_eq!(
            fs::read(&path).unwrap(),
            b"\xff\xfeCFLAGS=-Wno-nontrivial-memaccess\xc3\n".to_vec()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_are_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("configure.sh");
        fs::write(&path, "cc -Wno-nontrivial-memcall\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        replacer()
            .process_file(&path, ProcessOptions::default())
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.gn"), "-Wno-nontrivial-memcall\n").unwrap();
        fs::write(root.join("b.cmake"), "x -Wno-nontrivial-memcall -Wno-nontrivial-memcall\n")
            .unwrap();
        fs::write(root.join("c.txt"), "untouched\n").unwrap();
        let untouched = digest(&root.join("c.txt"));

        let first = replacer().apply(&scan(root));
        assert_eq!(first.modified.len(), 2);
        assert_eq!(first.replacements, 3);
        assert!(first.failed.is_empty());
        assert_eq!(digest(&root.join("c.txt")), untouched);

        let second_report = scan(root);
        assert!(second_report.is_empty());
        let second = replacer().apply(&second_report);
        assert!(second.modified.is_empty());
    }

    #[test]
    fn test_apply_continues_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let good = root.join("good.txt");
        fs::write(&good, "-Wno-nontrivial-memcall\n").unwrap();

        let mut report = scan(root);
        report.files.insert(
            0,
            FileMatches {
                path: root.join("vanished.txt"),
                lines: Vec::new(),
            },
        );

        let summary = replacer().apply(&report);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, root.join("vanished.txt"));
        assert_eq!(summary.modified, vec![good.clone()]);
        assert_eq!(
            fs::read_to_string(&good).unwrap(),
            "-Wno-nontrivial-memaccess\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_kept_and_target_rewritten() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let target = elsewhere.path().join("flags.gn");
        fs::write(&target, "cflags = [ \"-Wno-nontrivial-memcall\" ]\n").unwrap();
        let link = temp_dir.path().join("link.gn");
        symlink(&target, &link).unwrap();

        let summary = replacer().apply(&scan(temp_dir.path()));
        assert_eq!(summary.modified, vec![link.clone()]);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "cflags = [ \"-Wno-nontrivial-memaccess\" ]\n"
        );
    }
}
