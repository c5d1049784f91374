use crate::errors::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The deprecated clang flag searched for by default.
pub const DEFAULT_BAD_FLAG: &str = "-Wno-nontrivial-memcall";

/// The flag written in its place by default.
pub const DEFAULT_GOOD_FLAG: &str = "-Wno-nontrivial-memaccess";

/// Directory names that are never descended into.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[".git", "out", "node_modules", "__pycache__", ".cache"];

/// File extensions classified as binary without reading any content.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp",
    "pdf", "zip", "tar", "gz", "bz2", "xz", "7z",
    "exe", "dll", "so", "dylib", "a", "o", "obj",
    "pyc", "pyo", "class", "jar",
    "woff", "woff2", "ttf", "otf", "eot",
    "mp3", "mp4", "avi", "mov", "mkv", "wav",
    "db", "sqlite", "sqlite3",
];

/// Number of leading bytes inspected for a NUL when sniffing content.
pub const DEFAULT_SNIFF_BYTES: usize = 8192;

/// Name of the per-user config directory under the XDG config home.
const CONFIG_DIR_NAME: &str = "flagfix";

/// Everything that parameterizes a run.
///
/// The defaults reproduce the memcall -> memaccess fix. A YAML file may override
/// any subset of the fields; missing keys keep their default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlagConfig {
    /// The literal string to search for.
    pub bad_flag: String,
    /// The literal string written in place of `bad_flag`.
    pub good_flag: String,
    /// Directory names pruned from traversal, together with their subtrees.
    pub skip_dirs: BTreeSet<String>,
    /// Lower-case extensions, without a leading dot, that are never scanned.
    pub binary_extensions: BTreeSet<String>,
    /// How many leading bytes are sniffed for a NUL.
    pub sniff_bytes: usize,
    /// Commit message override. See [`FlagConfig::commit_message`].
    #[serde(rename = "commit_message")]
    pub commit_message_override: Option<String>,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            bad_flag: DEFAULT_BAD_FLAG.to_string(),
            good_flag: DEFAULT_GOOD_FLAG.to_string(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            binary_extensions: DEFAULT_BINARY_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sniff_bytes: DEFAULT_SNIFF_BYTES,
            commit_message_override: None,
        }
    }
}

impl FlagConfig {
    /// The message used for the commit created by `--commit`.
    pub fn commit_message(&self) -> String {
        match &self.commit_message_override {
            Some(message) => message.clone(),
            None => format!("fix: replace {} -> {}", self.bad_flag, self.good_flag),
        }
    }

    /// Normalizes extensions and rejects configurations that cannot work.
    pub fn validate(mut self) -> Result<Self> {
        if self.bad_flag.is_empty() {
            return Err("bad_flag must not be empty".into());
        }
        if self.bad_flag.contains('\n') {
            return Err("bad_flag must fit on a single line".into());
        }
        if self.bad_flag == self.good_flag {
            return Err(format!(
                "good_flag must differ from bad_flag ('{}')",
                self.bad_flag
            )
            .into());
        }
        if self.sniff_bytes == 0 {
            return Err("sniff_bytes must be greater than zero".into());
        }

        self.binary_extensions = self
            .binary_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(self)
    }
}

/// A utility for locating and loading [`FlagConfig`] files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Finds the configuration file by searching in a prioritized list of locations.
    ///
    /// The search order is:
    /// 1. `config_path` as given (absolute, or relative to the current directory).
    /// 2. `config_path` relative to the scan root.
    /// 3. Inside the `flagfix` directory under the user's config home.
    pub fn find_config(config_path: &Path, root: &Path) -> Result<PathBuf> {
        if config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        let mut tried_locations = vec![config_path.display().to_string()];

        if config_path.is_relative() {
            let in_root = root.join(config_path);
            if in_root.exists() {
                return Ok(in_root);
            }
            tried_locations.push(in_root.display().to_string());

            if let Some(config_home) = dirs::config_dir() {
                let user_config = config_home.join(CONFIG_DIR_NAME).join(config_path);
                if user_config.exists() {
                    return Ok(user_config);
                }
                tried_locations.push(user_config.display().to_string());
            }
        }

        Err(format!(
            "Config file '{}' not found. Searched in:\n  - {}",
            config_path.display(),
            tried_locations.join("\n  - ")
        )
        .into())
    }

    /// Loads and validates a `FlagConfig` from a YAML file.
    pub fn load(path: &Path) -> Result<FlagConfig> {
        let file = File::open(path)?;
        let config: FlagConfig = serde_yaml::from_reader(file)?;
        config.validate()
    }
}
