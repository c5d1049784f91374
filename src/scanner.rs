use crate::classifier::{BinaryClassifier, Classification};
use crate::errors::Result;
use crate::patterns::FlagPattern;
use crate::walker::TreeWalker;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The core engine for locating the bad flag in a tree.
///
/// A `Scanner` pairs the literal flag matcher with the binary classifier. Files
/// are read as raw bytes and split on `\n`; matching happens on the bytes and
/// only the reported line text is decoded (lossily) for display.
pub struct Scanner {
    pattern: FlagPattern,
    classifier: BinaryClassifier,
    progress: bool,
}

/// One line containing the bad flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    /// 1-based line number.
    pub line_number: usize,
    /// The line text without its trailing newline.
    pub line_content: String,
    /// How many times the flag appears on this line.
    pub occurrences: usize,
}

/// All matching lines of a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMatches {
    pub path: PathBuf,
    pub lines: Vec<LineMatch>,
}

impl FileMatches {
    /// Total occurrences across all lines of the file.
    pub fn occurrences(&self) -> usize {
        self.lines.iter().map(|l| l.occurrences).sum()
    }
}

/// Result of scanning a whole tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    /// Files with at least one match, in traversal order.
    pub files: Vec<FileMatches>,
    pub files_scanned: usize,
    pub files_skipped_binary: usize,
    pub files_unreadable: usize,
}

impl ScanReport {
    pub fn total_occurrences(&self) -> usize {
        self.files.iter().map(FileMatches::occurrences).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of `path` relative to the scanned root, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

impl Scanner {
    pub fn new(pattern: FlagPattern, classifier: BinaryClassifier) -> Self {
        Self {
            pattern,
            classifier,
            progress: false,
        }
    }

    /// Show a spinner on stderr while walking the tree.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Scans a single file that already passed the classifier.
    ///
    /// Returns `None` when the flag does not appear in the file.
    pub fn scan_file(&self, path: &Path) -> Result<Option<FileMatches>> {
        let content = fs::read(path)?;
        if !self.pattern.is_match(&content) {
            return Ok(None);
        }

        let lines: Vec<LineMatch> = content
            .split(|&b| b == b'\n')
            .enumerate()
            .filter_map(|(idx, line_bytes)| {
                let occurrences = self.pattern.count(line_bytes);
                (occurrences > 0).then(|| LineMatch {
                    line_number: idx + 1,
                    line_content: String::from_utf8_lossy(line_bytes)
                        .trim_end_matches('\r')
                        .to_string(),
                    occurrences,
                })
            })
            .collect();

        Ok(Some(FileMatches {
            path: path.to_path_buf(),
            lines,
        }))
    }

    /// Walks the tree and collects every text file containing the flag.
    ///
    /// Unreadable entries are logged and counted; they never abort the scan.
    pub fn scan_tree(&self, walker: &TreeWalker) -> ScanReport {
        let mut report = ScanReport {
            root: walker.root().to_path_buf(),
            ..ScanReport::default()
        };

        let pb = if self.progress {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("[{elapsed_precise}] {spinner} {pos} files {msg}")
            {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        for entry in walker.walk() {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Could not read directory entry: {e}");
                    report.files_unreadable += 1;
                    continue;
                }
            };

            pb.inc(1);
            pb.set_message(report.relative(&path).display().to_string());

            match self.classifier.classify(&path) {
                Classification::Text => {}
                Classification::Binary => {
                    debug!("Skipping binary file {}", path.display());
                    report.files_skipped_binary += 1;
                    continue;
                }
                Classification::Unreadable(e) => {
                    warn!("Could not read {}: {e}", path.display());
                    report.files_unreadable += 1;
                    continue;
                }
            }

            match self.scan_file(&path) {
                Ok(Some(matches)) => {
                    debug!(
                        "{}: {} occurrence(s)",
                        path.display(),
                        matches.occurrences()
                    );
                    report.files_scanned += 1;
                    report.files.push(matches);
                }
                Ok(None) => report.files_scanned += 1,
                Err(e) => {
                    warn!("Could not read {}: {e}", path.display());
                    report.files_unreadable += 1;
                }
            }
        }

        pb.finish_and_clear();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlagConfig;
    use std::fs;
    use tempfile::TempDir;

    fn scanner() -> Scanner {
        let config = FlagConfig::default();
        Scanner::new(
            FlagPattern::from_config(&config).unwrap(),
            BinaryClassifier::from_config(&config),
        )
    }

    fn walker(root: &Path) -> TreeWalker {
        TreeWalker::new(root, FlagConfig::default().skip_dirs)
    }

    #[test]
    fn test_reports_line_numbers_and_content() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("BUILD.gn");
        fs::write(
            &test_file,
            "config(\"x\") {\r\n  flags = [\"-Wno-nontrivial-memcall\"]\r\n}\r\n",
        )
        .unwrap();

        let matches = scanner().scan_file(&test_file).unwrap().unwrap();
        assert_eq!(
            matches.lines,
            vec![LineMatch {
                line_number: 2,
                line_content: "  flags = [\"-Wno-nontrivial-memcall\"]".to_string(),
                occurrences: 1,
            }]
        );
    }

    #[test]
    fn test_counts_every_occurrence_on_a_line() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("Makefile");
        fs::write(
            &test_file,
            "CFLAGS += -Wno-nontrivial-memcall -Wno-nontrivial-memcall\nLDFLAGS +=\n-Wno-nontrivial-memcall",
        )
        .unwrap();

        let matches = scanner().scan_file(&test_file).unwrap().unwrap();
        assert_eq!(matches.lines.len(), 2);
        assert_eq!(matches.lines[0].occurrences, 2);
        assert_eq!(matches.lines[1].line_number, 3);
        assert_eq!(matches.occurrences(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("latin1.txt");
        fs::write(&test_file, b"caf\xe9 -Wno-nontrivial-memcall\n").unwrap();

        let matches = scanner().scan_file(&test_file).unwrap().unwrap();
        assert_eq!(matches.lines[0].line_content, "caf\u{FFFD} -Wno-nontrivial-memcall");
    }

    #[test]
    fn test_file_without_flag_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("clean.txt");
        fs::write(&test_file, "-Wno-nontrivial-memaccess\n").unwrap();
        assert!(scanner().scan_file(&test_file).unwrap().is_none());
    }

    #[test]
    fn test_scan_tree_filters_binary_and_skipped_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(root.join("build/flags.gni"), "-Wno-nontrivial-memcall\n").unwrap();
        fs::write(root.join("node_modules/dep/flags.gni"), "-Wno-nontrivial-memcall\n").unwrap();
        fs::write(root.join("icon.png"), "-Wno-nontrivial-memcall\n").unwrap();
        fs::write(root.join("object.bin"), b"\0-Wno-nontrivial-memcall\n").unwrap();
        fs::write(root.join("README.md"), "nothing to see\n").unwrap();

        let report = scanner().scan_tree(&walker(root));
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.relative(&report.files[0].path), Path::new("build/flags.gni"));
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_skipped_binary, 2);
        assert_eq!(report.total_occurrences(), 1);
    }

    #[test]
    fn test_scan_tree_empty_when_flag_absent() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "hello\n").unwrap();

        let report = scanner().scan_tree(&walker(temp_dir.path()));
        assert!(report.is_empty());
        assert_eq!(report.total_occurrences(), 0);
    }
}
