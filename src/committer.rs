use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// The version-control operations needed to record a rewrite.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// Stages a single file.
    fn stage(&self, path: &Path) -> Result<()>;
    /// Creates a commit from the staged changes and returns the tool's output.
    fn commit(&self, message: &str) -> Result<String>;
}

/// `VersionControl` backed by the `git` executable.
pub struct GitCommitter {
    work_tree: PathBuf,
}

impl GitCommitter {
    pub fn new(work_tree: impl Into<PathBuf>) -> Self {
        Self {
            work_tree: work_tree.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("Running git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_tree)
            .output()?;

        if !output.status.success() {
            return Err(Error::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

impl VersionControl for GitCommitter {
    fn stage(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.run(&["add", "--", &*path])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        let output = self.run(&["commit", "-m", message])?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Stages each file individually, then records a single commit.
///
/// Nothing is invoked when `files` is empty and `Ok(None)` is returned. The first
/// failure aborts the step; files already rewritten on disk are left as they are.
pub fn commit_changes<V>(vcs: &V, files: &[PathBuf], message: &str) -> Result<Option<String>>
where
    V: VersionControl + ?Sized,
{
    if files.is_empty() {
        return Ok(None);
    }

    for file in files {
        vcs.stage(file)?;
    }

    vcs.commit(message).map(Some)
}

/// Returns the top-level directory of the git work tree containing `dir`.
pub fn discover_repo_root(dir: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let top = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!top.is_empty()).then(|| PathBuf::from(top))
}
