use crate::errors::{Error, Result};
use ignore::{DirEntry, WalkBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Recursive directory traversal that prunes a fixed set of directory names.
///
/// Every regular file (or symlink to one) under `root` is yielded, except those below a
/// directory whose name is in the skip-set. Pruned directories are never opened.
/// Within a directory, entries are visited in file-name order.
pub struct TreeWalker {
    root: PathBuf,
    skip_dirs: Arc<BTreeSet<String>>,
    respect_gitignore: bool,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>, skip_dirs: BTreeSet<String>) -> Self {
        Self {
            root: root.into(),
            skip_dirs: Arc::new(skip_dirs),
            respect_gitignore: false,
        }
    }

    /// Additionally honour `.gitignore`, `.ignore` and git exclude files.
    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.respect_gitignore = yes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yields candidate file paths.
    ///
    /// Entries the walker could not read are yielded as errors so the caller can
    /// report them and carry on.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf>> + use<> {
        let skip_dirs = Arc::clone(&self.skip_dirs);

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(self.respect_gitignore)
            .hidden(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| !is_skipped_dir(entry, &skip_dirs));

        builder.build().filter_map(|entry| match entry {
            Ok(entry) if is_candidate_file(&entry) => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(Error::from(e))),
        })
    }
}

/// Regular files, plus symlinks whose target is a regular file.
///
/// Links to directories are not descended into.
fn is_candidate_file(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_file() => true,
        Some(ft) if ft.is_symlink() => {
            let is_file = entry.path().is_file();
            if !is_file {
                debug!("Not following symlink {}", entry.path().display());
            }
            is_file
        }
        _ => false,
    }
}

/// The root is never pruned, even if its own name is in the skip-set.
fn is_skipped_dir(entry: &DirEntry, skip_dirs: &BTreeSet<String>) -> bool {
    entry.depth() > 0
        && entry.file_type().is_some_and(|ft| ft.is_dir())
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| skip_dirs.contains(name))
}
